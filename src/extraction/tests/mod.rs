use crate::error::DecodeError;
use crate::extraction::*;
use flate2::Compression;
use flate2::write::GzEncoder;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a gzip-compressed tar archive from (path, content) pairs
fn create_tgz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, *content).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

// ---------------------------------------------------------------------------
// decode_tgz
// ---------------------------------------------------------------------------

#[test]
fn single_entry_archive_decodes_to_its_text() {
    let archive = create_tgz(&[("answer.md", "hello".as_bytes())]);
    assert_eq!(decode_tgz(&archive).unwrap(), "hello");
}

#[test]
fn multiple_entries_are_concatenated_in_archive_order() {
    let archive = create_tgz(&[("a.txt", "first ".as_bytes()), ("dir/b.txt", "second".as_bytes())]);
    assert_eq!(decode_tgz(&archive).unwrap(), "first second");
}

#[test]
fn empty_entry_contributes_nothing() {
    let archive = create_tgz(&[("empty.txt", "".as_bytes()), ("data.txt", "payload".as_bytes())]);
    assert_eq!(decode_tgz(&archive).unwrap(), "payload");
}

#[test]
fn utf8_content_survives() {
    let text = "(◕◞౪◟◕‵) résumé";
    let archive = create_tgz(&[("emoji.txt", text.as_bytes())]);
    assert_eq!(decode_tgz(&archive).unwrap(), text);
}

#[test]
fn plain_bytes_are_rejected_as_corrupt() {
    let result = decode_tgz(b"definitely not gzip data");
    assert!(
        matches!(result, Err(DecodeError::Corrupt(_))),
        "expected corrupt archive, got {result:?}"
    );
}

// ---------------------------------------------------------------------------
// decode_archive (async wrapper)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn decode_archive_runs_off_the_runtime() {
    let archive = create_tgz(&[("result.json", r#"{"ok":true}"#.as_bytes())]);
    let text = decode_archive(archive).await.unwrap();
    assert_eq!(text, r#"{"ok":true}"#);
}

#[tokio::test]
async fn decode_archive_propagates_corruption() {
    let err = decode_archive(vec![0x1f, 0x8b, 0x07, 0, 0, 0, 0, 0, 0, 0xff]).await.unwrap_err();
    assert!(matches!(err, DecodeError::Corrupt(_)));
}
