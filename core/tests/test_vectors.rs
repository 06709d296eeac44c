//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results or error kinds. Comparing parsed JSON (not raw
//! strings) avoids false negatives from field-ordering differences.

use craft_core::{
    ApiError, BatchOutcome, Block, CraftClient, FetchParams, HttpMethod, HttpRequest,
    HttpResponse, InsertRequest, MoveRequest, SearchMatch, SearchParams, UploadLink,
    UploadLinkRequest,
};
use serde_json::Value;

const BASE_URL: &str = "https://craft.test/api/v1";

fn client() -> CraftClient {
    CraftClient::new(BASE_URL)
}

fn load(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|pair| {
                    let pair = pair.as_array().unwrap();
                    (
                        pair[0].as_str().unwrap().to_string(),
                        pair[1].as_str().unwrap().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");
    assert_eq!(req.query, pairs(&expected["query"]), "{name}: query");
    assert_eq!(req.headers, pairs(&expected["headers"]), "{name}: headers");
    match expected.get("body") {
        Some(body) => {
            let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&sent, body, "{name}: body");
        }
        None => assert!(req.body.is_none(), "{name}: body should be None"),
    }
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse::new(
        sim["status"].as_u64().unwrap() as u16,
        sim["body"].as_str().unwrap(),
    )
}

/// Check `result` against `expected_error` or hand the value to `check`.
fn assert_outcome<T>(name: &str, case: &Value, result: Result<T, ApiError>, check: impl FnOnce(T)) {
    match case.get("expected_error") {
        Some(expected) => {
            let err = match result {
                Ok(_) => panic!("{name}: expected an error"),
                Err(err) => err,
            };
            match expected["kind"].as_str().unwrap() {
                "UnexpectedStatus" => {
                    let status = expected["status"].as_u64().unwrap() as u16;
                    assert_eq!(err.status(), Some(status), "{name}: status");
                }
                "Decode" => assert!(matches!(err, ApiError::Decode(_)), "{name}: expected Decode"),
                other => panic!("{name}: unknown expected_error: {other}"),
            }
        }
        None => check(result.unwrap_or_else(|e| panic!("{name}: unexpected error: {e}"))),
    }
}

fn assert_batch(name: &str, outcome: BatchOutcome, expected: &Value) {
    let ids: Vec<String> = serde_json::from_value(expected["ids"].clone()).unwrap();
    assert_eq!(outcome.ids, ids, "{name}: ids");
    assert_eq!(outcome.partial, expected["partial"].as_bool().unwrap(), "{name}: partial");
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

#[test]
fn fetch_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/fetch.json")) {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let params = FetchParams {
            id: input["id"].as_str().map(str::to_string),
            max_depth: input["max_depth"].as_u64().map(|d| d as u32),
            fetch_metadata: input["fetch_metadata"].as_bool().unwrap(),
        };

        let req = c.build_fetch_blocks(&params);
        assert_request(name, &req, &case["expected_request"]);

        assert_outcome(name, &case, c.parse_fetch_blocks(simulated(&case)), |block| {
            let expected: Block = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(block, expected, "{name}: parsed result");
        });
    }
}

// ---------------------------------------------------------------------------
// Insert
// ---------------------------------------------------------------------------

#[test]
fn insert_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/insert.json")) {
        let name = case["name"].as_str().unwrap();
        let input: InsertRequest = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_insert_blocks(&input).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        assert_outcome(name, &case, c.parse_insert_blocks(simulated(&case)), |blocks| {
            let expected: Vec<Block> =
                serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(blocks, expected, "{name}: parsed result");
            assert!(blocks.iter().all(|b| !b.id.is_empty()), "{name}: ids assigned");
        });
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn delete_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/delete.json")) {
        let name = case["name"].as_str().unwrap();
        let ids: Vec<String> = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_delete_blocks(&ids).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        assert_outcome(name, &case, c.parse_delete_blocks(simulated(&case)), |outcome| {
            assert!(outcome.ids.iter().all(|id| ids.contains(id)), "{name}: subset of request");
            assert_batch(name, outcome, &case["expected_result"]);
        });
    }
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

#[test]
fn move_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/move.json")) {
        let name = case["name"].as_str().unwrap();
        let input: MoveRequest = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_move_blocks(&input).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        assert_outcome(name, &case, c.parse_move_blocks(simulated(&case)), |outcome| {
            assert_batch(name, outcome, &case["expected_result"]);
        });
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[test]
fn search_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/search.json")) {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let params = SearchParams {
            pattern: input["pattern"].as_str().unwrap().to_string(),
            case_sensitive: input["case_sensitive"].as_bool().unwrap(),
            before_block_count: input["before_block_count"].as_u64().unwrap() as u32,
            after_block_count: input["after_block_count"].as_u64().unwrap() as u32,
        };

        let req = c.build_search(&params).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        assert_outcome(name, &case, c.parse_search(simulated(&case)), |matches| {
            let expected: Vec<SearchMatch> =
                serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(matches, expected, "{name}: parsed result");
            for m in &matches {
                assert!(m.before_blocks.len() <= params.before_block_count as usize, "{name}: before context");
                assert!(m.after_blocks.len() <= params.after_block_count as usize, "{name}: after context");
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Upload link
// ---------------------------------------------------------------------------

#[test]
fn upload_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/upload.json")) {
        let name = case["name"].as_str().unwrap();
        let input: UploadLinkRequest = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_generate_upload_url(&input).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        assert_outcome(name, &case, c.parse_generate_upload_url(simulated(&case)), |link| {
            let expected: UploadLink =
                serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(link, expected, "{name}: parsed result");
        });
    }
}
