// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn request_round_trips_through_json() {
    let request = Request::Start {
        name: "svc".into(),
        env: vec!["A=1".into()],
        wait: true,
    };
    let json = serde_json::to_vec(&request).unwrap();
    let decoded: Request = serde_json::from_slice(&json).unwrap();
    assert!(matches!(decoded, Request::Start { name, wait: true, .. } if name == "svc"));
}

#[test]
fn wait_defaults_to_true_for_job_requests() {
    let decoded: Request =
        serde_json::from_str(r#"{"request":"start","name":"svc"}"#).unwrap();
    assert!(matches!(decoded, Request::Start { wait: true, .. }));
}

#[test]
fn wait_defaults_to_false_for_emit() {
    let decoded: Request = serde_json::from_str(r#"{"request":"emit","name":"boom"}"#).unwrap();
    assert!(matches!(decoded, Request::Emit { wait: false, .. }));
}

#[test]
fn response_round_trips_through_json() {
    let response = Response::Error {
        error: CoreError::UnknownJob { name: "x".into() },
    };
    let json = serde_json::to_vec(&response).unwrap();
    let decoded: Response = serde_json::from_slice(&json).unwrap();
    assert_eq!(decoded, response);
}

#[test]
fn reply_body_maps_to_response() {
    assert_eq!(Response::from(ReplyBody::Ok), Response::Ok);
    assert_eq!(
        Response::from(ReplyBody::Stopped { job: "svc".into() }),
        Response::Stopped { job: "svc".into() }
    );
    assert_eq!(
        Response::from(ReplyBody::EventFinished { name: "e".into() }),
        Response::EventFinished { name: "e".into() }
    );
}

#[tokio::test]
async fn frames_round_trip_over_a_socket_pair() {
    let (mut client, mut server) = tokio::io::duplex(1024);

    send(&mut client, &Request::Status { name: "svc".into() })
        .await
        .unwrap();
    let received = read_request(&mut server, DEFAULT_TIMEOUT).await.unwrap();
    assert!(matches!(received, Request::Status { name } if name == "svc"));

    write_response(&mut server, &Response::Pong, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(read_response(&mut client).await.unwrap(), Response::Pong);
}

#[tokio::test]
async fn several_frames_on_one_connection_stay_separate() {
    let (mut client, mut server) = tokio::io::duplex(1024);

    send(&mut client, &Request::Ping).await.unwrap();
    send(&mut client, &Request::List).await.unwrap();

    assert!(matches!(
        recv::<Request, _>(&mut server).await.unwrap(),
        Request::Ping
    ));
    assert!(matches!(
        recv::<Request, _>(&mut server).await.unwrap(),
        Request::List
    ));
}

#[tokio::test]
async fn hangup_reads_as_disconnect() {
    let (client, mut server) = tokio::io::duplex(1024);
    drop(client);

    let result = recv::<Request, _>(&mut server).await;
    assert!(matches!(result, Err(ProtocolError::Disconnected)));
}

#[tokio::test]
async fn oversized_header_is_rejected_before_reading_the_body() {
    let (mut client, mut server) = tokio::io::duplex(1024);
    let header = (MAX_FRAME_BYTES as u32 + 1).to_be_bytes();
    client.write_all(&header).await.unwrap();

    let result = recv::<Request, _>(&mut server).await;
    assert!(matches!(
        result,
        Err(ProtocolError::FrameTooLarge(len)) if len == MAX_FRAME_BYTES + 1
    ));
}

#[tokio::test]
async fn garbage_body_is_malformed() {
    let (mut client, mut server) = tokio::io::duplex(1024);
    client.write_all(&4u32.to_be_bytes()).await.unwrap();
    client.write_all(b"!!!!").await.unwrap();

    let result = recv::<Request, _>(&mut server).await;
    assert!(matches!(result, Err(ProtocolError::Malformed(_))));
}

#[tokio::test]
async fn silent_peer_times_out() {
    let (_client, mut server) = tokio::io::duplex(1024);

    let result = read_request(&mut server, Duration::from_millis(20)).await;
    assert!(matches!(result, Err(ProtocolError::TimedOut(_))));
}
