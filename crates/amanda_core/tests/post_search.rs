use amanda_core::db::open_db_in_memory;
use amanda_core::{
    search_posts_or_empty, KeywordRepository, KeywordService, Post, PostRepository,
    PostSearchQuery, SearchService, SqliteKeywordRepository, SqlitePostRepository,
    SqliteUserRepository, UserRepository, RECENT_POST_LIMIT,
};
use rusqlite::Connection;

fn seed_post(conn: &mut Connection, author: &str, title: &str, keywords: Option<&str>) -> i64 {
    let user = SqliteUserRepository::new(conn)
        .get_or_create_user(author)
        .unwrap();
    let post_id = SqlitePostRepository::new(conn)
        .create_post(user.id, title, "post body long enough")
        .unwrap();
    if let Some(keywords) = keywords {
        KeywordService::new(conn)
            .merge_keyword_string(keywords, post_id)
            .unwrap();
    }
    post_id
}

fn ids(posts: &[Post]) -> Vec<i64> {
    posts.iter().map(|post| post.id).collect()
}

#[test]
fn keyword_search_matches_keywords_contained_in_search_string() {
    let mut conn = open_db_in_memory().unwrap();
    let post_id = seed_post(&mut conn, "Bob", "Cats", Some("cats"));
    let service = SearchService::new(&conn);

    let hits = service.find_by_keyword_string("I really love cats").unwrap();
    assert_eq!(ids(&hits), vec![post_id]);
    assert_eq!(hits[0].author.name, "Bob");

    assert!(service.find_by_keyword_string("cat").unwrap().is_empty());
}

#[test]
fn keyword_search_returns_each_post_once() {
    let mut conn = open_db_in_memory().unwrap();
    let post_id = seed_post(&mut conn, "Bob", "Pets", Some("cats, dogs"));
    let service = SearchService::new(&conn);

    let hits = service.find_by_keyword_string("cats and dogs").unwrap();
    assert_eq!(ids(&hits), vec![post_id]);
}

#[test]
fn no_filters_return_all_posts() {
    let mut conn = open_db_in_memory().unwrap();
    let a = seed_post(&mut conn, "Bob", "First", Some("cats"));
    let b = seed_post(&mut conn, "Doug", "Second", None);
    let service = SearchService::new(&conn);

    assert_eq!(ids(&service.search(None, None).unwrap()), vec![a, b]);
    assert_eq!(ids(&service.search(Some("  "), Some("")).unwrap()), vec![a, b]);
}

#[test]
fn author_only_filter_uses_case_sensitive_substring() {
    let mut conn = open_db_in_memory().unwrap();
    let bob = seed_post(&mut conn, "Bob", "First", None);
    let bobby = seed_post(&mut conn, "Bobby", "Second", None);
    seed_post(&mut conn, "Doug", "Third", None);
    seed_post(&mut conn, "bob", "Fourth", None);
    let service = SearchService::new(&conn);

    assert_eq!(ids(&service.search(None, Some("Bob")).unwrap()), vec![bob, bobby]);
}

#[test]
fn combined_filter_narrows_keyword_hits_by_author() {
    let mut conn = open_db_in_memory().unwrap();
    let post_a = seed_post(&mut conn, "Bob", "Post A", Some("cats"));
    seed_post(&mut conn, "Doug", "Post B", Some("cats"));
    let service = SearchService::new(&conn);

    let hits = service.search(Some("cats"), Some("Bob")).unwrap();
    assert_eq!(ids(&hits), vec![post_a]);
}

#[test]
fn combined_filter_falls_back_to_full_author_scan_when_no_keyword_matches() {
    let mut conn = open_db_in_memory().unwrap();
    let post_a = seed_post(&mut conn, "Bob", "Post A", None);
    seed_post(&mut conn, "Doug", "Post B", Some("dogs"));
    let service = SearchService::new(&conn);

    let hits = service
        .search(Some("nonexistent-keyword"), Some("Bob"))
        .unwrap();
    assert_eq!(ids(&hits), vec![post_a]);
}

#[test]
fn combined_filter_can_end_empty_when_keyword_hits_have_other_authors() {
    let mut conn = open_db_in_memory().unwrap();
    seed_post(&mut conn, "Bob", "Post A", None);
    seed_post(&mut conn, "Doug", "Post B", Some("cats"));
    let service = SearchService::new(&conn);

    assert!(service.search(Some("cats"), Some("Bob")).unwrap().is_empty());
}

#[test]
fn listing_envelope_reports_counts() {
    let mut conn = open_db_in_memory().unwrap();
    seed_post(&mut conn, "Bob", "Post A", Some("cats"));

    let response = search_posts_or_empty(
        &conn,
        &PostSearchQuery {
            keyword_string: Some("cats".to_string()),
            author_name: None,
        },
    );
    assert!(response.ok);
    assert_eq!(response.items.len(), 1);
    assert_eq!(response.message, "Found 1 post.");
}

#[test]
fn listing_envelope_turns_storage_errors_into_empty_result() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE post_keywords;").unwrap();

    let response = search_posts_or_empty(
        &conn,
        &PostSearchQuery {
            keyword_string: Some("cats".to_string()),
            author_name: None,
        },
    );
    assert!(!response.ok);
    assert!(response.items.is_empty());
    assert!(response.message.contains("post search failed"));
}

#[test]
fn keyword_search_handles_more_posts_than_sqlite_bind_limit() {
    const POSTS: i64 = 33_000;
    let mut conn = open_db_in_memory().unwrap();
    seed_post(&mut conn, "Bob", "Seed", Some("cats"));
    let cats = SqliteKeywordRepository::new(&conn)
        .find_keyword_by_text("cats")
        .unwrap()
        .unwrap();

    let tx = conn.transaction().unwrap();
    tx.execute(
        "WITH RECURSIVE seq(n) AS (SELECT 2 UNION ALL SELECT n + 1 FROM seq WHERE n < ?1)
         INSERT INTO posts (user_id, title, content)
         SELECT (SELECT id FROM users WHERE name = 'Bob'), 'post ' || n, 'bulk body' FROM seq;",
        [POSTS],
    )
    .unwrap();
    tx.execute(
        "INSERT OR IGNORE INTO post_keywords (post_id, keyword_id) SELECT id, ?1 FROM posts;",
        [cats.id],
    )
    .unwrap();
    tx.commit().unwrap();

    let service = SearchService::new(&conn);
    let hits = service.find_by_keyword_string("I love cats").unwrap();
    assert_eq!(hits.len() as i64, POSTS);
    assert!(hits.windows(2).all(|pair| pair[0].id < pair[1].id));

    assert_eq!(
        service.posts_by_keyword_ids(&[cats.id]).unwrap().len() as i64,
        POSTS
    );

    let response = search_posts_or_empty(
        &conn,
        &PostSearchQuery {
            keyword_string: Some("cats".to_string()),
            author_name: Some("Bob".to_string()),
        },
    );
    assert!(response.ok);
    assert_eq!(response.items.len() as i64, POSTS);
}

#[test]
fn posts_by_author_id_ignore_name_lookalikes() {
    let mut conn = open_db_in_memory().unwrap();
    let bob_post = seed_post(&mut conn, "Bob", "First", None);
    seed_post(&mut conn, "Bobby", "Second", None);
    let bob = SqliteUserRepository::new(&conn)
        .find_user_by_name("Bob")
        .unwrap()
        .unwrap();

    let posts = SearchService::new(&conn).posts_by_author_id(bob.id).unwrap();
    assert_eq!(ids(&posts), vec![bob_post]);
}

#[test]
fn recent_posts_are_capped_newest_first() {
    let mut conn = open_db_in_memory().unwrap();
    let created: Vec<i64> = (0..RECENT_POST_LIMIT + 2)
        .map(|n| seed_post(&mut conn, "Bob", &format!("Post {n}"), None))
        .collect();

    let recent = SearchService::new(&conn).recent_posts().unwrap();
    let expected: Vec<i64> = created.iter().rev().take(RECENT_POST_LIMIT).copied().collect();
    assert_eq!(ids(&recent), expected);
}

#[test]
fn find_matches_title_or_keyword_text() {
    let mut conn = open_db_in_memory().unwrap();
    let titled = seed_post(&mut conn, "Bob", "Rust tips", None);
    let tagged = seed_post(&mut conn, "Doug", "Weekend", Some("rustacean"));
    let other = seed_post(&mut conn, "Doug", "Gardening", Some("plants"));
    let service = SearchService::new(&conn);

    assert_eq!(ids(&service.find("Rust").unwrap()), vec![titled]);
    assert_eq!(ids(&service.find("rust").unwrap()), vec![tagged]);
    assert_eq!(ids(&service.find(" ").unwrap()), vec![titled, tagged, other]);
}
