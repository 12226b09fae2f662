// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn ctx(cmd_tx: mpsc::Sender<DaemonCmd>) -> ListenCtx {
    ListenCtx {
        cmd_tx,
        replies: Arc::new(Replies::new()),
        session: None,
    }
}

#[test]
fn replies_hand_out_unique_tokens() {
    let replies = Replies::new();
    let (a, _rx_a) = replies.register();
    let (b, _rx_b) = replies.register();
    assert_ne!(a, b);
}

#[tokio::test]
async fn respond_delivers_to_the_registered_channel() {
    let replies = Replies::new();
    let (token, rx) = replies.register();

    replies.respond(token, Response::Pong);

    assert_eq!(rx.await.unwrap(), Response::Pong);
}

#[test]
fn respond_to_unknown_token_is_harmless() {
    let replies = Replies::new();
    replies.respond(ReplyToken::new(99), Response::Pong);
}

#[tokio::test]
async fn ping_answers_without_touching_the_engine() {
    let (cmd_tx, mut cmd_rx) = mpsc::channel(1);
    let ctx = ctx(cmd_tx);

    let response = dispatch(Request::Ping, &ctx).await;

    assert_eq!(response, Response::Pong);
    assert!(cmd_rx.try_recv().is_err());
}

#[tokio::test]
async fn start_request_is_forwarded_and_answered() {
    let (cmd_tx, mut cmd_rx) = mpsc::channel(1);
    let ctx = Arc::new(ctx(cmd_tx));

    let dispatcher = {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            dispatch(
                Request::Start {
                    name: "svc".into(),
                    env: vec!["A=1".into()],
                    wait: true,
                },
                &ctx,
            )
            .await
        })
    };

    // The engine side of the conversation.
    let cmd = cmd_rx.recv().await.unwrap();
    let token = match cmd {
        DaemonCmd::Core(Input::Start {
            name,
            env,
            wait,
            reply,
            ..
        }) => {
            assert_eq!(name, "svc");
            assert_eq!(env, vec!["A=1".to_string()]);
            assert!(wait);
            reply
        }
        other => panic!("expected start input, got {other:?}"),
    };
    ctx.replies.respond(token, Response::Ok);

    assert_eq!(dispatcher.await.unwrap(), Response::Ok);
}

#[tokio::test]
async fn emit_without_wait_answers_immediately() {
    let (cmd_tx, mut cmd_rx) = mpsc::channel(1);
    let ctx = ctx(cmd_tx);

    let response = dispatch(
        Request::Emit {
            name: "boom".into(),
            env: Vec::new(),
            wait: false,
        },
        &ctx,
    )
    .await;

    assert_eq!(response, Response::Ok);
    assert!(matches!(
        cmd_rx.recv().await,
        Some(DaemonCmd::Core(Input::Emit { reply: None, .. }))
    ));
}

#[tokio::test]
async fn closed_engine_channel_reports_failure() {
    let (cmd_tx, cmd_rx) = mpsc::channel(1);
    drop(cmd_rx);
    let ctx = ctx(cmd_tx);

    let response = dispatch(Request::List, &ctx).await;

    assert!(matches!(response, Response::Failed { .. }));
}

#[tokio::test]
async fn session_scope_is_threaded_through() {
    let (cmd_tx, mut cmd_rx) = mpsc::channel(1);
    let mut ctx = ctx(cmd_tx);
    ctx.session = Some(SessionId::new(7));

    let _ = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        dispatch(
            Request::Stop {
                name: "svc".into(),
                env: Vec::new(),
                wait: false,
            },
            &ctx,
        ),
    )
    .await;

    match cmd_rx.recv().await.unwrap() {
        DaemonCmd::Core(Input::Stop { session, .. }) => {
            assert_eq!(session, Some(SessionId::new(7)));
        }
        other => panic!("expected stop input, got {other:?}"),
    }
}
