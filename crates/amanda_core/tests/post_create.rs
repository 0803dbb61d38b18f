use amanda_core::db::open_db_in_memory;
use amanda_core::{
    Enrichment, EnrichmentError, FollowUpError, KeywordServiceError, NewPost, PostEnricher,
    PostService, PostServiceError, PostValidationError, ScoredKeyword, SearchService,
};

struct StubEnricher {
    response: Result<Enrichment, EnrichmentError>,
}

impl PostEnricher for StubEnricher {
    fn enrich(&self, _content: &str) -> Result<Enrichment, EnrichmentError> {
        self.response.clone()
    }
}

fn scored(keyword: &str, confidence_score: f64) -> ScoredKeyword {
    ScoredKeyword {
        keyword: keyword.to_string(),
        confidence_score,
    }
}

#[test]
fn create_post_persists_author_post_and_keywords() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = PostService::new(&mut conn);

    let request = NewPost::new("Bob", "Cats", "I really love my cats").with_keywords("Cats, pets");
    let created = service.create_post(&request, None).unwrap();

    assert!(created.follow_up_errors.is_empty());
    assert_eq!(created.detail.post.author.name, "Bob");
    let texts: Vec<_> = created
        .detail
        .keywords
        .iter()
        .map(|keyword| keyword.text.as_str())
        .collect();
    assert_eq!(texts, vec!["cats", "pets"]);
    assert_eq!(created.merge.unwrap().links.len(), 2);
}

#[test]
fn same_author_name_reuses_author_row() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = PostService::new(&mut conn);

    let first = service
        .create_post(&NewPost::new("Bob", "First", "first post body"), None)
        .unwrap();
    let second = service
        .create_post(&NewPost::new("Bob", "Second", "second post body"), None)
        .unwrap();
    assert_eq!(first.detail.post.author, second.detail.post.author);
}

#[test]
fn invalid_request_stores_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = PostService::new(&mut conn);

    let err = service
        .create_post(&NewPost::new("Bob", "Cats", "too short"), None)
        .unwrap_err();
    assert!(matches!(
        err,
        PostServiceError::Validation(PostValidationError::ContentTooShort)
    ));

    let posts = SearchService::new(&conn).search(None, None).unwrap();
    assert!(posts.is_empty());
}

#[test]
fn failed_keyword_merge_keeps_post_and_reports_error() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = PostService::new(&mut conn);

    let request = NewPost::new("Bob", "Cats", "I really love my cats").with_keywords("cats,");
    let created = service.create_post(&request, None).unwrap();

    assert!(created.merge.is_none());
    assert!(created.detail.keywords.is_empty());
    assert!(matches!(
        created.follow_up_errors.as_slice(),
        [FollowUpError::KeywordMerge(KeywordServiceError::InvalidArgument(_))]
    ));

    let posts = SearchService::new(&conn).search(None, Some("Bob")).unwrap();
    assert_eq!(posts.len(), 1);
}

#[test]
fn enrichment_fields_and_suggested_keywords_are_applied() {
    let mut conn = open_db_in_memory().unwrap();
    let enricher = StubEnricher {
        response: Ok(Enrichment {
            summary: Some("A post about cats".to_string()),
            sentiment: Some(0.9),
            image_hrefs: vec!["https://img.example/cat.png".to_string()],
            keywords: vec![scored("felines", 0.8), scored("Cats", 0.95), scored("fur", 0.2)],
        }),
    };
    let mut service = PostService::new(&mut conn);

    let mut request = NewPost::new("Bob", "Cats", "I really love my cats").with_keywords("pets");
    request.enrich = true;
    let created = service.create_post(&request, Some(&enricher)).unwrap();

    assert!(created.follow_up_errors.is_empty());
    let post = &created.detail.post;
    assert_eq!(post.sentiment, Some(0.9));
    assert_eq!(post.image_href.as_deref(), Some("https://img.example/cat.png"));
    assert_eq!(post.summary.as_deref(), Some("A post about cats"));

    let texts: Vec<_> = created
        .detail
        .keywords
        .iter()
        .map(|keyword| keyword.text.as_str())
        .collect();
    assert_eq!(texts, vec!["cats", "felines", "fur", "pets"]);
}

#[test]
fn enricher_is_ignored_when_request_does_not_ask_for_it() {
    let mut conn = open_db_in_memory().unwrap();
    let enricher = StubEnricher {
        response: Err(EnrichmentError::Unavailable("should not be called".to_string())),
    };
    let mut service = PostService::new(&mut conn);

    let created = service
        .create_post(&NewPost::new("Bob", "Cats", "I really love my cats"), Some(&enricher))
        .unwrap();
    assert!(created.follow_up_errors.is_empty());
    assert!(created.merge.is_none());
}

#[test]
fn enrichment_failure_keeps_post_and_still_merges_keywords() {
    let mut conn = open_db_in_memory().unwrap();
    let enricher = StubEnricher {
        response: Err(EnrichmentError::Unavailable("timeout".to_string())),
    };
    let mut service = PostService::new(&mut conn);

    let mut request = NewPost::new("Bob", "Cats", "I really love my cats").with_keywords("cats");
    request.enrich = true;
    let created = service.create_post(&request, Some(&enricher)).unwrap();

    assert!(matches!(
        created.follow_up_errors.as_slice(),
        [FollowUpError::Enrichment(EnrichmentError::Unavailable(_))]
    ));
    assert!(created.detail.post.sentiment.is_none());
    assert_eq!(created.detail.keywords.len(), 1);
}

#[test]
fn merge_keywords_on_existing_post_adds_links() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = PostService::new(&mut conn);
    let created = service
        .create_post(
            &NewPost::new("Bob", "Cats", "I really love my cats").with_keywords("cats"),
            None,
        )
        .unwrap();
    let post_id = created.detail.post.id;

    service.merge_keywords(post_id, "cats, dogs").unwrap();

    let detail = service.get_post_detail(post_id).unwrap().unwrap();
    assert_eq!(detail.keywords.len(), 2);
    assert!(service.get_post_detail(post_id + 1).unwrap().is_none());
}
