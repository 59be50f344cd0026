use std::time::Duration;

use bytes::Bytes;
use chat_panel_model::{
    ErrorKind, Message, ProviderConfig, ProviderConfigBuilder, RequestOptions,
    Role,
};
use chat_panel_test_transport::{PresetReply, TestTransport};
use serde_json::json;

use crate::{ConversationClient, DecodeStats, FailurePolicy};

fn config() -> ProviderConfig {
    ProviderConfigBuilder::with_endpoint("https://llm.example.com/v1/chat")
        .with_credential("sk-test")
        .with_default_model("gpt-test")
        .build()
}

fn client(transport: &TestTransport) -> ConversationClient<TestTransport> {
    ConversationClient::new(transport.clone(), config(), None)
}

#[tokio::test]
async fn test_send_message_appends_in_order() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::completion("Hi there!"));
    let client = client(&transport);

    let reply = client
        .send_message("Hello", &RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(reply, "Hi there!");
    assert_eq!(
        client.transcript(),
        [Message::user("Hello"), Message::assistant("Hi there!")]
    );
}

#[tokio::test]
async fn test_reply_keeps_endpoint_role() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::json(
        200,
        r#"{"choices":[{"message":{"role":"system","content":"odd"}}]}"#,
    ));
    let client = client(&transport);

    client
        .send_message("Hello", &RequestOptions::default())
        .await
        .unwrap();

    let last = client.transcript().pop().unwrap();
    assert_eq!(last.role, Role::System);
    assert_eq!(last.content, "odd");
}

#[tokio::test]
async fn test_system_seeding() {
    let transport = TestTransport::default();
    let seeded = ConversationClient::new(
        transport.clone(),
        config(),
        Some("Be brief.".to_owned()),
    );
    assert_eq!(seeded.transcript(), [Message::system("Be brief.")]);

    let unseeded = client(&transport);
    assert!(unseeded.transcript().is_empty());

    let empty = ConversationClient::new(transport, config(), Some(String::new()));
    assert!(empty.transcript().is_empty());
}

#[tokio::test]
async fn test_transcript_is_replayed() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::completion("One"));
    transport.push_reply(PresetReply::completion("Two"));
    let client = ConversationClient::new(
        transport.clone(),
        config(),
        Some("sys".to_owned()),
    );

    let options = RequestOptions::default();
    client.send_message("first", &options).await.unwrap();
    client.send_message("second", &options).await.unwrap();

    let body = transport.last_request_json().unwrap();
    assert_eq!(
        body["messages"],
        json!([
            { "role": "system", "content": "sys" },
            { "role": "user", "content": "first" },
            { "role": "assistant", "content": "One" },
            { "role": "user", "content": "second" }
        ])
    );
}

#[tokio::test]
async fn test_default_options() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::completion("ok"));
    let client = client(&transport);

    client
        .send_message("Hello", &RequestOptions::default())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "https://llm.example.com/v1/chat");
    assert_eq!(requests[0].bearer_token, "sk-test");
    assert!(!requests[0].streaming);

    let body = transport.last_request_json().unwrap();
    assert_eq!(body["temperature"], json!(0.7));
    assert_eq!(body["max_tokens"], json!(150));
    assert_eq!(body["model"], json!("gpt-test"));
    assert_eq!(body["stream"], json!(false));
}

#[tokio::test]
async fn test_explicit_options() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::completion("ok"));
    let client = client(&transport);

    let options = RequestOptions::default()
        .with_temperature(0.0)
        .with_max_tokens(32)
        .with_model("gpt-other");
    client.send_message("Hello", &options).await.unwrap();

    let body = transport.last_request_json().unwrap();
    assert_eq!(body["temperature"], json!(0.0));
    assert_eq!(body["max_tokens"], json!(32));
    assert_eq!(body["model"], json!("gpt-other"));
}

#[tokio::test]
async fn test_streaming_reassembly() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::event_stream([
        r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#,
        r#"data: {"choices":[{"delta":{"content":"lo"}}]}"#,
        "data: [DONE]",
    ]));
    let client = client(&transport);

    let mut chunks = vec![];
    client
        .send_streaming_message(
            "Greet me",
            |chunk| chunks.push(chunk.to_owned()),
            &RequestOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(chunks, ["Hel", "lo"]);
    assert_eq!(
        client.transcript(),
        [Message::user("Greet me"), Message::assistant("Hello")]
    );

    let body = transport.last_request_json().unwrap();
    assert_eq!(body["stream"], json!(true));
    assert!(transport.requests()[0].streaming);
}

#[tokio::test]
async fn test_malformed_lines_are_skipped() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::event_stream([
        r#"data: {"choices":[{"delta":{"content":"a"}}]}"#,
        "data: {not json",
        ": keep-alive",
        "",
        r#"data: {"choices":[{"delta":{}}]}"#,
        r#"data: {"choices":[{"delta":{"content":"b"}}]}"#,
        "data: [DONE]",
    ]));
    let client = client(&transport);

    let mut stream = client
        .stream_message("Hi", &RequestOptions::default())
        .await
        .unwrap();
    let mut fragments = vec![];
    while let Some(fragment) = stream.next_fragment().await.unwrap() {
        fragments.push(fragment);
    }
    let expected_stats = DecodeStats {
        data_lines: 5,
        fragments: 2,
        malformed: 2,
    };
    assert_eq!(stream.stats(), expected_stats);
    assert_eq!(stream.content(), "ab");
    drop(stream);

    assert_eq!(fragments, ["a", "b"]);
    assert_eq!(client.transcript()[1], Message::assistant("ab"));
    assert_eq!(client.decode_stats(), expected_stats);
}

#[tokio::test]
async fn test_stream_split_across_chunks() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::with_chunks(
        200,
        Some("text/event-stream; charset=utf-8"),
        [
            Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"con"),
            Bytes::from_static(b"tent\":\"caf\xC3"),
            Bytes::from_static(b"\xA9\"}}]}\r\n\r\ndata: [DONE]"),
        ],
    ));
    let client = client(&transport);

    let mut chunks = vec![];
    client
        .send_streaming_message(
            "Order",
            |chunk| chunks.push(chunk.to_owned()),
            &RequestOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(chunks, ["café"]);
    assert_eq!(client.transcript()[1], Message::assistant("café"));
}

#[tokio::test]
async fn test_send_message_with_stream_option() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::deltas(["Str", "eam", "ed"]));
    let client = client(&transport);

    let reply = client
        .send_message("Hi", &RequestOptions::default().with_stream(true))
        .await
        .unwrap();

    assert_eq!(reply, "Streamed");
    assert_eq!(client.transcript()[1], Message::assistant("Streamed"));
    assert_eq!(transport.last_request_json().unwrap()["stream"], json!(true));
}

#[tokio::test]
async fn test_rate_limit_classification() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::json(429, r#"{"error":"slow down"}"#));
    transport.push_reply(PresetReply::json(500, r#"{"error":"boom"}"#));
    let client = client(&transport);
    let options = RequestOptions::default();

    let err = client.send_message("a", &options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);
    assert!(err.is_rate_limited());
    assert_eq!(err.status(), Some(429));
    assert_eq!(
        err.to_string(),
        "Rate limit exceeded. Please try again later."
    );

    let err = client.send_message("b", &options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Endpoint);
    assert!(!err.is_rate_limited());
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.body(), Some(r#"{"error":"boom"}"#));
    assert_eq!(err.to_string(), r#"API Error: 500 - {"error":"boom"}"#);
}

#[tokio::test]
async fn test_streaming_error_status() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::json(429, "{}"));
    let client = client(&transport);

    let err = client
        .send_streaming_message(
            "a",
            |_| unreachable!("no chunk expected"),
            &RequestOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_failure_keeps_user_message() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::failure("connection refused"));
    let client = client(&transport);

    let err = client
        .send_message("Hello", &RequestOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.message(), "connection refused");
    assert_eq!(err.status(), None);
    assert!(!err.is_timeout());
    assert_eq!(client.transcript(), [Message::user("Hello")]);
}

#[tokio::test]
async fn test_failure_rolls_back() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::json(503, "unavailable"));
    transport.push_reply(PresetReply::completion("Hi"));
    let client = ConversationClient::builder(transport.clone(), config())
        .with_system_prompt("sys")
        .with_failure_policy(FailurePolicy::RollBack)
        .build();
    let options = RequestOptions::default();

    client.send_message("Hello", &options).await.unwrap_err();
    assert_eq!(client.transcript(), [Message::system("sys")]);

    client.send_message("Hello again", &options).await.unwrap();
    assert_eq!(
        client.transcript(),
        [
            Message::system("sys"),
            Message::user("Hello again"),
            Message::assistant("Hi"),
        ]
    );
}

#[tokio::test]
async fn test_broken_stream() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::deltas(["partial"]).broken());
    let client = client(&transport);

    let mut chunks = vec![];
    let err = client
        .send_streaming_message(
            "Hello",
            |chunk| chunks.push(chunk.to_owned()),
            &RequestOptions::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(chunks, ["partial"]);
    // No partial reply is committed.
    assert_eq!(client.transcript(), [Message::user("Hello")]);
}

#[tokio::test]
async fn test_decode_errors() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::json(200, r#"{"choices":[]}"#));
    transport.push_reply(PresetReply::json(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
    ));
    transport.push_reply(PresetReply::json(200, "<html>oops</html>"));
    let client = client(&transport);
    let options = RequestOptions::default();

    for _ in 0..3 {
        let err = client.send_message("Hello", &options).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.body().is_some());
    }
}

#[tokio::test]
async fn test_snapshot_is_a_copy() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::completion("Hi"));
    let client = client(&transport);
    client
        .send_message("Hello", &RequestOptions::default())
        .await
        .unwrap();

    let first = client.transcript();
    let mut second = client.transcript();
    assert_eq!(first, second);

    second.clear();
    second.push(Message::user("injected"));
    assert_eq!(client.transcript(), first);
}

#[tokio::test]
async fn test_reset() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::completion("Hi"));
    let client = ConversationClient::new(
        transport.clone(),
        config(),
        Some("sys".to_owned()),
    );
    client
        .send_message("Hello", &RequestOptions::default())
        .await
        .unwrap();

    client.reset();
    assert!(client.transcript().is_empty());

    client.reset_with_system_prompt("new sys");
    assert_eq!(client.transcript(), [Message::system("new sys")]);
}

#[tokio::test]
async fn test_reset_during_stream() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::deltas(["late"]));
    let client = client(&transport);

    let mut stream = client
        .stream_message("Hello", &RequestOptions::default())
        .await
        .unwrap();
    client.reset();
    while stream.next_fragment().await.unwrap().is_some() {}
    drop(stream);

    assert!(client.transcript().is_empty());
}

#[tokio::test]
async fn test_dropped_stream() {
    let transport = TestTransport::default();
    transport.push_reply(PresetReply::deltas(["a", "b"]));
    transport.push_reply(PresetReply::deltas(["c", "d"]));
    let client = ConversationClient::builder(transport.clone(), config())
        .with_failure_policy(FailurePolicy::RollBack)
        .build();
    let options = RequestOptions::default();

    let mut stream = client.stream_message("first", &options).await.unwrap();
    assert_eq!(stream.next_fragment().await.unwrap().unwrap(), "a");
    drop(stream);
    assert!(client.transcript().is_empty());

    // The conversation is free again.
    client
        .send_streaming_message("second", |_| {}, &options)
        .await
        .unwrap();
    assert_eq!(
        client.transcript(),
        [Message::user("second"), Message::assistant("cd")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_deadline() {
    let transport = TestTransport::default();
    transport.push_reply(
        PresetReply::deltas(["slow", "reply"])
            .with_chunk_delay(Duration::from_secs(10)),
    );
    let client = client(&transport);

    let err = client
        .send_streaming_message(
            "Hello",
            |_| {},
            &RequestOptions::default().with_timeout(Duration::from_secs(15)),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_timeout());
    assert_eq!(client.transcript(), [Message::user("Hello")]);
}

#[tokio::test]
async fn test_concurrent_requests_are_serialized() {
    let transport = TestTransport::default();
    transport.push_reply(
        PresetReply::deltas(["one"]).with_chunk_delay(Duration::from_millis(5)),
    );
    transport.push_reply(PresetReply::completion("two"));
    let client = client(&transport);
    let options = RequestOptions::default();

    let (first, second) = tokio::join!(
        client.send_streaming_message("a", |_| {}, &options),
        client.send_message("b", &options),
    );
    first.unwrap();
    assert_eq!(second.unwrap(), "two");

    assert_eq!(
        client.transcript(),
        [
            Message::user("a"),
            Message::assistant("one"),
            Message::user("b"),
            Message::assistant("two"),
        ]
    );
    let second_body = transport.last_request_json().unwrap();
    assert_eq!(second_body["messages"].as_array().unwrap().len(), 3);
}
