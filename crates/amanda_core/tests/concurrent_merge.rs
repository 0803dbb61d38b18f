use amanda_core::db::open_db;
use amanda_core::{
    KeywordRepository, KeywordService, PostKeywordRepository, PostRepository,
    SqliteKeywordRepository, SqlitePostKeywordRepository, SqlitePostRepository,
    SqliteUserRepository, UserRepository,
};
use std::sync::{Arc, Barrier};
use std::thread;

const WORKERS: usize = 8;

#[test]
fn concurrent_merges_from_separate_connections_keep_keywords_unique() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");

    // Migrate once up front so workers only open an up-to-date schema.
    let (shared_post, own_posts) = {
        let conn = open_db(&path).unwrap();
        let user = SqliteUserRepository::new(&conn)
            .get_or_create_user("Bob")
            .unwrap();
        let posts = SqlitePostRepository::new(&conn);
        let shared = posts.create_post(user.id, "Shared", "shared body").unwrap();
        let own: Vec<i64> = (0..WORKERS)
            .map(|idx| {
                posts
                    .create_post(user.id, &format!("Post {idx}"), "worker body")
                    .unwrap()
            })
            .collect();
        (shared, own)
    };

    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = own_posts
        .iter()
        .copied()
        .map(|own_post| {
            let barrier = Arc::clone(&barrier);
            let path = path.clone();
            thread::spawn(move || {
                let mut conn = open_db(&path).unwrap();
                barrier.wait();
                let mut service = KeywordService::new(&mut conn);
                let shared = service
                    .merge_keyword_string("Cats, dogs , BIRDS", shared_post)
                    .unwrap();
                let own = service
                    .merge_keyword_string("cats,dogs,birds", own_post)
                    .unwrap();
                (
                    shared.created_keywords + own.created_keywords,
                    shared.created_links + own.created_links,
                )
            })
        })
        .collect();

    let (mut created_keywords, mut created_links) = (0, 0);
    for handle in handles {
        let (keywords, links) = handle.join().unwrap();
        created_keywords += keywords;
        created_links += links;
    }
    // Exactly one writer inserts each row, whoever wins the race.
    assert_eq!(created_keywords, 3);
    assert_eq!(created_links, 3 * (WORKERS + 1));

    let conn = open_db(&path).unwrap();
    let keywords = SqliteKeywordRepository::new(&conn).list_keywords().unwrap();
    let texts: Vec<_> = keywords.iter().map(|k| k.text.as_str()).collect();
    assert_eq!(texts, vec!["birds", "cats", "dogs"]);

    let links = SqlitePostKeywordRepository::new(&conn);
    assert_eq!(links.links_for_post(shared_post).unwrap().len(), 3);
    for own_post in own_posts {
        assert_eq!(links.links_for_post(own_post).unwrap().len(), 3);
    }

    let total_links: i64 = conn
        .query_row("SELECT COUNT(*) FROM post_keywords;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(total_links, 3 * (WORKERS as i64 + 1));
}
