//! Calculator demo: a tiny service exercising all four rapace call patterns
//! over an in-memory transport. Run with `cargo run -p rapace-demo-calculator`.

use futures_util::stream::{self, StreamExt};
use rapace::prelude::*;
use rapace_transport_mem::MemTransport;

fn calculator_service() -> ServiceContract {
    ServiceContract::define("Calculator", |svc| {
        svc.unary::<(i64, i64), i64, JsonCodec, JsonCodec, _, _>(
            "Add",
            MethodMetadata::default(),
            |(a, b)| async move { Ok(a + b) },
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
                inbound.map(|item| item.map(|msg| format!("server says: {msg}")))
            },
        );
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let (client_transport, server_transport) = MemTransport::pair();

    let server = Endpoint::new(server_transport, Side::Server, EndpointConfig::default());
    server
        .register_service(calculator_service())
        .expect("service names are unique");

    let client = Endpoint::new(client_transport, Side::Client, EndpointConfig::default());

    // 1. Unary: add two numbers.
    let sum: i64 = client
        .unary_request("Calculator", "Add")
        .call::<JsonCodec, JsonCodec>((17, 25))
        .await
        .expect("unary add");
    println!("Add(17, 25) = {sum}");

    // 2. Server streaming, cancelled mid-flight: the server counts forever,
    // the client reads three values then cancels rather than draining it.
    let mut counting = client
        .server_stream("Calculator", "CountForever")
        .call::<JsonCodec, JsonCodec>(0u32)
        .await
        .expect("open CountForever");
    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(counting.next().await.expect("value").expect("ok"));
    }
    counting.cancel().await;
    println!("CountForever produced {seen:?} before cancellation");

    // 3. Client streaming: upload ten 4-byte chunks, get the total size back.
    let chunks = stream::iter((0..10).map(|_| vec![0u8; 4]));
    let total: usize = client
        .client_stream("Calculator", "TotalSize")
        .call::<BytesCodec, JsonCodec, _>(chunks)
        .await
        .expect("client stream upload");
    println!("TotalSize of 10 x 4-byte chunks = {total}");

    // 4. Bidirectional: send four messages, read the echoed replies.
    let outgoing = stream::iter(
        ["hello", "how are you", "goodbye", "done"]
            .into_iter()
            .map(str::to_string),
    );
    let mut chat = client
        .bidirectional_stream("Calculator", "Chat")
        .call::<JsonCodec, JsonCodec, _>(outgoing)
        .await
        .expect("open Chat");
    while let Some(reply) = chat.next().await {
        println!("Chat: {}", reply.expect("reply"));
    }

    client.close().await;
}
