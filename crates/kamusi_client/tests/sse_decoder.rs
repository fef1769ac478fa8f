use std::io;

use bytes::Bytes;
use futures_util::{stream, StreamExt};
use kamusi_client::{decode_frames, parse_data, Frame};
use kamusi_core::StepStatus;
use pretty_assertions::assert_eq;

async fn decode(chunks: Vec<Vec<u8>>) -> Vec<Frame> {
    let body = stream::iter(
        chunks
            .into_iter()
            .map(|chunk| Ok::<_, io::Error>(Bytes::from(chunk))),
    );
    decode_frames(body)
        .map(|frame| frame.expect("no transport error"))
        .collect()
        .await
}

fn steps(frames: &[Frame]) -> Vec<(String, StepStatus)> {
    frames
        .iter()
        .filter_map(|frame| match frame {
            Frame::Step(event) => Some((event.step.clone(), event.status)),
            Frame::Malformed { .. } => None,
        })
        .collect()
}

#[tokio::test]
async fn reassembles_frames_split_across_chunks() {
    let frames = decode(vec![
        b"data: {\"step\":\"guard".to_vec(),
        b"_check\",\"status\":\"running\"}\r\n\r\nda".to_vec(),
        b"ta: {\"step\":\"guard_check\",\"status\":\"done\"}\n\n".to_vec(),
    ])
    .await;
    assert_eq!(
        steps(&frames),
        vec![
            ("guard_check".to_string(), StepStatus::Running),
            ("guard_check".to_string(), StepStatus::Done),
        ]
    );
}

#[tokio::test]
async fn reassembles_split_utf8() {
    let text = "data: {\"step\":\"ñandu\",\"status\":\"done\"}\n\n".as_bytes();
    let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
    let (head, tail) = text.split_at(split);

    let frames = decode(vec![head.to_vec(), tail.to_vec()]).await;
    assert_eq!(steps(&frames), vec![("ñandu".to_string(), StepStatus::Done)]);
}

#[tokio::test]
async fn dispatches_unterminated_last_frame() {
    let frames = decode(vec![
        b"data: {\"step\":\"vector_search\",\"status\":\"running\"}\n\n".to_vec(),
        b"data: {\"step\":\"complete\",\"status\":\"done\",\"data\":{\"query\":\"chakula\"}}".to_vec(),
    ])
    .await;
    assert_eq!(
        steps(&frames),
        vec![
            ("vector_search".to_string(), StepStatus::Running),
            ("complete".to_string(), StepStatus::Done),
        ]
    );
}

#[tokio::test]
async fn skips_comments_and_blank_payloads_but_reports_bad_json() {
    let frames = decode(vec![
        b": keep-alive\n\n".to_vec(),
        b"data:   \n\n".to_vec(),
        b"data: {oops\n\n".to_vec(),
        b"data: {\"step\":\"score_check\",\"status\":\"done\"}\n\n".to_vec(),
    ])
    .await;
    assert_eq!(frames.len(), 2);
    assert!(matches!(&frames[0], Frame::Malformed { data, .. } if data == "{oops"));
    assert_eq!(steps(&frames), vec![("score_check".to_string(), StepStatus::Done)]);
}

#[test]
fn parse_data_trims_and_ignores_blank() {
    assert_eq!(parse_data("  "), None);
    let Some(Frame::Step(event)) = parse_data(" {\"step\":\"prompt_build\",\"status\":\"running\"} ")
    else {
        panic!("expected a step frame");
    };
    assert_eq!(event.step, "prompt_build");
    assert!(event.data.is_empty());
}
