//! End-to-end run of every client operation against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `BlockingClient`
//! with the default ureq transport over real HTTP. Validates request
//! building, transport encoding, and response parsing together.

use craft_core::{
    ApiError, Block, BlockingClient, FetchParams, InsertRequest, MoveRequest, Position,
    SearchParams, TextStyle, UpdateRequest, UploadLinkRequest, Width,
};

fn start_mock_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

#[test]
fn document_lifecycle() {
    let api = BlockingClient::connect(&start_mock_server());

    // Step 1: root at depth 0 has the well-known id and no children.
    let root = api.fetch_blocks(&FetchParams::root().depth(0)).unwrap();
    assert_eq!(root.id, "0");
    assert!(root.content.is_empty());

    // Step 2: fetch is idempotent without mutation.
    let again = api.fetch_blocks(&FetchParams::root().depth(0)).unwrap();
    assert_eq!(root, again);

    // Step 3: insert markdown at the end of the root.
    let inserted = api
        .insert_blocks(&InsertRequest::markdown("Hello", Position::end(&root.id)))
        .unwrap();
    assert_eq!(inserted.len(), 1);
    assert!(!inserted[0].id.is_empty());
    assert_eq!(inserted[0].markdown.as_deref(), Some("Hello"));
    let hello = inserted[0].id.clone();

    // Step 4: fetch it back by id.
    let fetched = api.fetch_blocks(&FetchParams::block(&hello).depth(0)).unwrap();
    assert_eq!(fetched.markdown.as_deref(), Some("Hello"));

    // Step 5: insert a block list; count and order are preserved.
    let blocks = vec![
        Block::page("Plans").with_child(Block::text("TODO: ship it").with_indentation(1)),
        Block::text("Heading").with_text_style(TextStyle::H2),
        Block::text("tail"),
    ];
    let inserted = api
        .insert_blocks(&InsertRequest::blocks(blocks, Position::after(&hello)))
        .unwrap();
    let markdowns: Vec<_> = inserted.iter().filter_map(|b| b.markdown.as_deref()).collect();
    assert_eq!(markdowns, ["Plans", "Heading", "tail"]);
    assert!(inserted.iter().all(|b| !b.id.is_empty()));
    let plans = inserted[0].clone();
    let todo = plans.content[0].id.clone();
    let heading = inserted[1].id.clone();
    let tail = inserted[2].id.clone();
    assert_eq!(inserted[1].text_style, Some(TextStyle::H2));

    // Step 6: whole tree in document order.
    let tree = api.fetch_blocks(&FetchParams::root()).unwrap();
    let order: Vec<&str> = tree.walk().map(|b| b.id.as_str()).collect();
    assert_eq!(order, ["0", hello.as_str(), plans.id.as_str(), todo.as_str(), heading.as_str(), tail.as_str()]);
    assert_eq!(tree.count(), 6);

    // Step 7: markdown rendering comes back verbatim as text.
    let markdown = api.fetch_blocks_markdown(&FetchParams::root()).unwrap();
    assert!(markdown.contains("Hello"));
    assert!(markdown.contains("TODO: ship it"));

    // Step 8: search with context never exceeds the requested counts.
    let matches = api.search(&SearchParams::new("todo").context(1, 10)).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].block_id, todo);
    assert_eq!(matches[0].before_blocks.len(), 1);
    assert_eq!(matches[0].before_blocks[0].block_id, plans.id);
    assert_eq!(matches[0].after_blocks.len(), 2);
    let path: Vec<&str> = matches[0].page_block_path.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(path, ["0", plans.id.as_str()]);

    let none = api
        .search(&SearchParams::new("todo: SHIP").case_sensitive())
        .unwrap();
    assert!(none.is_empty());

    // Step 9: update markdown and width.
    let updated = api
        .update_blocks(&UpdateRequest {
            blocks: vec![Block::text("Hello, world").with_id(&hello).with_width(Width::Pixels(600))],
        })
        .unwrap();
    assert_eq!(updated[0].markdown.as_deref(), Some("Hello, world"));
    assert_eq!(updated[0].width, Some(Width::Pixels(600)));

    // Step 10: move with one unknown id is a partial success.
    let requested = vec![tail.clone(), "ghost".to_string()];
    let moved = api
        .move_blocks(&MoveRequest {
            block_ids: requested.clone(),
            position: Position::start(&plans.id),
        })
        .unwrap();
    assert!(moved.partial);
    assert_eq!(moved.ids, [tail.clone()]);
    assert_eq!(moved.missing(&requested), ["ghost"]);
    let plans_now = api.fetch_blocks(&FetchParams::block(&plans.id).depth(1)).unwrap();
    assert_eq!(plans_now.content[0].id, tail);

    // Step 11: delete of only unknown ids is 207 with nothing deleted.
    let outcome = api.delete_blocks(&["nonexistent".to_string()]).unwrap();
    assert!(outcome.partial);
    assert!(outcome.ids.is_empty());

    // Step 12: delete real blocks.
    let outcome = api.delete_blocks(&[hello.clone(), plans.id.clone()]).unwrap();
    assert!(!outcome.partial);
    assert_eq!(outcome.ids.len(), 2);

    // Step 13: fetching a deleted block is a 404.
    let err = api.fetch_blocks(&FetchParams::block(&hello)).unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(err.status(), Some(404));
}

#[test]
fn upload_then_reference_from_block() {
    let api = BlockingClient::connect(&start_mock_server());

    let link = api
        .generate_upload_url(&UploadLinkRequest {
            file_name: "notes.txt".to_string(),
            mime_type: Some("text/plain".to_string()),
        })
        .unwrap();
    api.upload_file(&link, "text/plain", b"remember the milk").unwrap();

    let err = api
        .generate_upload_url(&UploadLinkRequest {
            file_name: String::new(),
            mime_type: None,
        })
        .unwrap_err();
    assert_eq!(err.status(), Some(400));

    // Storage is write-once.
    let err = api.upload_file(&link, "text/plain", b"again").unwrap_err();
    assert_eq!(err.status(), Some(409));

    let mut file = Block::image(&link.raw_url).with_width(Width::Auto);
    file.file_name = Some("notes.txt".to_string());
    let inserted = api
        .insert_blocks(&InsertRequest::blocks(vec![file], Position::end("0")))
        .unwrap();
    let id = inserted[0].id.clone();

    let plain = api.fetch_blocks(&FetchParams::block(&id)).unwrap();
    assert_eq!(plain.width, Some(Width::Auto));
    assert!(plain.mime_type.is_none());

    let detailed = api
        .fetch_blocks(&FetchParams::block(&id).with_metadata())
        .unwrap();
    assert_eq!(detailed.mime_type.as_deref(), Some("text/plain"));
    assert_eq!(detailed.file_size, Some(17));
}

#[test]
fn fetches_documents_larger_than_ten_mebibytes() {
    let api = BlockingClient::connect(&start_mock_server());

    let chunk = "x".repeat(1_800_000);
    for _ in 0..7 {
        api.insert_blocks(&InsertRequest::markdown(chunk.as_str(), Position::end("0")))
            .unwrap();
    }

    let tree = api.fetch_blocks(&FetchParams::root()).unwrap();
    assert_eq!(tree.content.len(), 7);
    assert!(tree.content.iter().all(|b| b.markdown.as_deref() == Some(chunk.as_str())));

    let markdown = api.fetch_blocks_markdown(&FetchParams::root()).unwrap();
    assert!(markdown.len() > 10 * 1024 * 1024);
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let api = BlockingClient::connect(&format!("http://{addr}"));
    let err = api.fetch_blocks(&FetchParams::root()).unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert!(err.is_retryable());
}
