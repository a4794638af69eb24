use futures_util::stream::{self, StreamExt};
use rapace::prelude::*;
use rapace_transport_mem::MemTransport;

fn calc_service() -> ServiceContract {
    ServiceContract::define("Calc", |svc| {
        svc.unary::<(i32, i32), i32, JsonCodec, JsonCodec, _, _>(
            "Add",
            MethodMetadata::default(),
            |(a, b)| async move { Ok(a + b) },
        );

        svc.server_streaming::<u32, u32, JsonCodec, JsonCodec, _, _>(
            "CountTo",
            MethodMetadata::default(),
            |n| stream::iter((0..n).map(Ok)),
        );

        svc.server_streaming::<u32, u32, JsonCodec, JsonCodec, _, _>(
            "CountForever",
            MethodMetadata::default(),
            |start| {
                stream::unfold(start, |i| async move {
                    tokio::task::yield_now().await;
                    Some((Ok(i), i + 1))
                })
            },
        );

        svc.client_streaming::<Vec<u8>, usize, BytesCodec, JsonCodec, _, _>(
            "TotalSize",
            MethodMetadata::default(),
            |mut inbound| async move {
                let mut total = 0usize;
                while let Some(chunk) = inbound.next().await {
                    total += chunk?.len();
                }
                Ok(total)
            },
        );

        svc.bidirectional::<String, String, JsonCodec, JsonCodec, _, _>(
            "Chat",
            MethodMetadata::default(),
            |inbound| {
                inbound.map(|item| item.map(|msg| format!("echo: {msg}")))
            },
        );
    })
}

async fn paired_endpoints() -> (Endpoint<MemTransport>, Endpoint<MemTransport>) {
    let (client_t, server_t) = MemTransport::pair();
    let server = Endpoint::new(server_t, Side::Server, EndpointConfig::default());
    server.register_service(calc_service()).unwrap();
    let client = Endpoint::new(client_t, Side::Client, EndpointConfig::default());
    // The client also holds the contract so `METHOD_TYPE_MISMATCH` can be
    // checked locally before any envelope is sent (§8.3); see
    // `method_type_mismatch_is_rejected_before_any_envelope_is_sent` below.
    client.register_service(calc_service()).unwrap();
    (client, server)
}

#[tokio::test]
async fn unary_add() {
    let (client, _server) = paired_endpoints().await;
    let sum: i32 = client
        .unary_request("Calc", "Add")
        .call::<JsonCodec, JsonCodec>((2, 3))
        .await
        .unwrap();
    assert_eq!(sum, 5);
}

#[tokio::test]
async fn unimplemented_method() {
    let (client, _server) = paired_endpoints().await;
    let err = client
        .unary_request::<(i32, i32), i32>("Calc", "Multiply")
        .call::<JsonCodec, JsonCodec>((2, 3))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unimplemented);
}

#[tokio::test]
async fn server_streaming_count() {
    let (client, _server) = paired_endpoints().await;
    let responses = client
        .server_stream("Calc", "CountTo")
        .call::<JsonCodec, JsonCodec>(5u32)
        .await
        .unwrap();
    let values: Vec<u32> = responses.map(|r| r.unwrap()).collect().await;
    assert_eq!(values, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn server_stream_cancel_stops_delivery() {
    let (client, _server) = paired_endpoints().await;
    let mut responses = client
        .server_stream("Calc", "CountForever")
        .call::<JsonCodec, JsonCodec>(0u32)
        .await
        .unwrap();

    let first = responses.next().await.unwrap().unwrap();
    assert_eq!(first, 0);

    responses.cancel().await;
    match responses.next().await {
        None => {}
        Some(Err(e)) => assert_eq!(e.code(), ErrorCode::Cancelled),
        Some(Ok(v)) => panic!("expected cancellation, got {v}"),
    }
}

#[tokio::test]
async fn client_streaming_upload() {
    let (client, _server) = paired_endpoints().await;
    let chunks = stream::iter((0..10).map(|_| vec![0u8; 4]));
    let total: usize = client
        .client_stream("Calc", "TotalSize")
        .call::<BytesCodec, JsonCodec, _>(chunks)
        .await
        .unwrap();
    assert_eq!(total, 40);
}

#[tokio::test]
async fn bidirectional_chat() {
    let (client, _server) = paired_endpoints().await;
    let outbound = stream::iter(vec!["hi".to_string(), "there".to_string()]);
    let responses = client
        .bidirectional_stream("Calc", "Chat")
        .call::<JsonCodec, JsonCodec, _>(outbound)
        .await
        .unwrap();
    let replies: Vec<String> = responses.map(|r| r.unwrap()).collect().await;
    assert_eq!(replies, vec!["echo: hi".to_string(), "echo: there".to_string()]);
}

#[tokio::test]
async fn method_type_mismatch_is_rejected_before_any_envelope_is_sent() {
    let (client, _server) = paired_endpoints().await;
    let err = client
        .server_stream::<(i32, i32), i32>("Calc", "Add")
        .call::<JsonCodec, JsonCodec>((1, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::MethodTypeMismatch { .. }));
}

#[tokio::test]
async fn close_fails_subsequent_calls() {
    let (client, _server) = paired_endpoints().await;
    client.close().await;
    let err = client
        .unary_request("Calc", "Add")
        .call::<JsonCodec, JsonCodec>((1, 2))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unavailable);
}

