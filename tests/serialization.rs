use std::io::{BufReader, Cursor};

use sdrscope::prelude::*;
use strum::IntoEnumIterator;

/// Four SDRs of the same shape, each last written through a different encoding.
fn samples() -> Vec<(&'static str, Sdr)> {
    let zero = Sdr::new(&[3, 3]).unwrap();

    let mut dense = Sdr::new(&[3, 3]).unwrap();
    dense.set_dense(&[0, 1, 0, 0, 1, 0, 0, 0, 1]).unwrap();

    let mut sparse = Sdr::new(&[3, 3]).unwrap();
    sparse.set_sparse(&[0, 2, 6, 8]).unwrap();

    let mut coordinates = Sdr::new(&[3, 3]).unwrap();
    coordinates
        .set_coordinates(&[vec![2, 0, 1], vec![1, 0, 2]])
        .unwrap();

    vec![
        ("zero", zero),
        ("dense", dense),
        ("sparse", sparse),
        ("coordinates", coordinates),
    ]
}

#[test]
fn every_format_round_trips_every_encoding() {
    for format in SerializableFormat::iter() {
        for (name, original) in samples() {
            let mut buffer = Vec::new();
            original.save(&mut buffer, format).unwrap();
            let restored = Sdr::load(&mut buffer.as_slice(), format).unwrap();

            assert_eq!(restored, original, "{name} via {format}");
            assert_eq!(restored.dimensions(), &[3, 3]);
            assert!(!restored.is_view());
        }
    }
}

#[test]
fn pretty_output_round_trips() {
    let (_, original) = samples().remove(3);
    for format in [SerializableFormat::Json, SerializableFormat::Xml] {
        let mut buffer = Vec::new();
        original
            .save_with_config(&mut buffer, format, &CodecConfig::human_readable())
            .unwrap();
        assert!(buffer.iter().filter(|&&byte| byte == b'\n').count() > 2);

        let restored = Sdr::load(&mut buffer.as_slice(), format).unwrap();
        assert_eq!(restored, original);
    }
}

#[test]
fn records_share_a_stream() {
    for format in SerializableFormat::iter() {
        let sdrs = samples();
        let mut rng = Random::new(77);
        rng.get_real64();

        let mut stream = Vec::new();
        for (_, sdr) in &sdrs {
            sdr.save(&mut stream, format).unwrap();
        }
        rng.save(&mut stream, format).unwrap();

        let mut reader = BufReader::new(Cursor::new(stream));
        for (name, sdr) in &sdrs {
            let restored = Sdr::load(&mut reader, format).unwrap();
            assert_eq!(&restored, sdr, "{name} via {format}");
        }
        let restored = Random::load(&mut reader, format).unwrap();
        assert_eq!(restored, rng, "generator via {format}");
    }
}

#[test]
fn saving_a_view_saves_its_value() {
    let mut root = Sdr::new(&[4, 4]).unwrap();
    root.set_sparse(&[1, 4, 8]).unwrap();
    let view = Sdr::reshape(&root, &[8, 2]).unwrap();

    for format in SerializableFormat::iter() {
        let mut buffer = Vec::new();
        view.save(&mut buffer, format).unwrap();
        let restored = Sdr::load(&mut buffer.as_slice(), format).unwrap();
        assert!(!restored.is_view());
        assert_eq!(restored.dimensions(), &[8, 2]);
        assert_eq!(restored.get_sparse().unwrap().to_vec(), vec![1, 4, 8]);
    }
}

#[test]
fn file_round_trip() {
    let directory = tempfile::tempdir().unwrap();
    let (_, original) = samples().remove(1);

    for format in SerializableFormat::iter() {
        let path = directory.path().join(format!("sample.{format}"));
        original.save_to_file(&path, format).unwrap();
        let restored = Sdr::load_from_file(&path, format).unwrap();
        assert_eq!(restored, original, "{format}");
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let directory = tempfile::tempdir().unwrap();
    let result = Sdr::load_from_file(directory.path().join("absent"), SerializableFormat::Json);
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn unknown_format_code_fails_before_io() {
    let sdr = Sdr::new(&[4]).unwrap();
    let mut buffer = Vec::new();
    assert!(matches!(
        sdr.save_with_code(&mut buffer, 4),
        Err(Error::Configuration(_))
    ));
    assert!(buffer.is_empty());

    assert!(matches!(
        Sdr::load_with_code(&mut &b"anything"[..], 17),
        Err(Error::Configuration(_))
    ));

    sdr.save_with_code(&mut buffer, 1).unwrap();
    let restored = Sdr::load_with_code(&mut buffer.as_slice(), 1).unwrap();
    assert_eq!(restored, sdr);
}

#[test]
fn mismatched_formats_are_rejected() {
    let (_, original) = samples().remove(2);
    for written in SerializableFormat::iter() {
        let mut buffer = Vec::new();
        original.save(&mut buffer, written).unwrap();
        for read in SerializableFormat::iter().filter(|&read| read != written) {
            let result = Sdr::load(&mut buffer.as_slice(), read);
            assert!(
                matches!(result, Err(Error::CorruptData { .. })),
                "{written} read as {read}: {result:?}"
            );
        }
    }
}

#[test]
fn truncated_records_are_corrupt() {
    let (_, original) = samples().remove(2);
    for format in SerializableFormat::iter() {
        let mut buffer = Vec::new();
        original.save(&mut buffer, format).unwrap();
        let truncated = &buffer[..buffer.len() / 2];
        let result = Sdr::load(&mut &truncated[..], format);
        assert!(
            matches!(result, Err(Error::CorruptData { .. })),
            "{format}: {result:?}"
        );
    }
}

#[test]
fn future_versions_are_reported() {
    let cases: [(SerializableFormat, &[u8]); 4] = [
        (SerializableFormat::Binary, b"SDRB\x02\x00\x00\x00\x00\x00"),
        (SerializableFormat::Portable, b"sdrscope-portable 2 SDR\nend\n"),
        (
            SerializableFormat::Json,
            br#"{"format":"sdrscope/json","version":2,"kind":"SDR","fields":{}}"#,
        ),
        (
            SerializableFormat::Xml,
            br#"<archive format="sdrscope/xml" version="2" kind="SDR"/>"#,
        ),
    ];

    for (format, bytes) in cases {
        let result = Sdr::load(&mut &bytes[..], format);
        assert!(
            matches!(
                result,
                Err(Error::VersionMismatch {
                    found: 2,
                    supported: 1
                })
            ),
            "{format}: {result:?}"
        );
    }
}

#[test]
fn invalid_values_in_well_formed_records_are_corrupt() {
    let cases: [(SerializableFormat, &[u8]); 3] = [
        (
            SerializableFormat::Portable,
            b"sdrscope-portable 1 SDR\ndimensions l 1 4\nsparse l 2 3 1\nend\n",
        ),
        (
            SerializableFormat::Json,
            br#"{"format":"sdrscope/json","version":1,"kind":"SDR","fields":{"dimensions":[4],"sparse":[4]}}"#,
        ),
        (
            SerializableFormat::Xml,
            br#"<archive format="sdrscope/xml" version="1" kind="Random"><scalar name="seed">1</scalar></archive>"#,
        ),
    ];

    for (format, bytes) in cases {
        let result = Sdr::load(&mut &bytes[..], format);
        assert!(
            matches!(result, Err(Error::CorruptData { .. })),
            "{format}: {result:?}"
        );
    }
}

#[test]
fn record_size_limit_applies_to_every_format() {
    let mut sdr = Sdr::new(&[1000]).unwrap();
    sdr.randomize(0.5, &mut Random::new(3)).unwrap();
    let config = CodecConfig::default().with_max_record_bytes(64);

    for format in SerializableFormat::iter() {
        let mut buffer = Vec::new();
        sdr.save(&mut buffer, format).unwrap();
        let result = Sdr::load_with_config(&mut buffer.as_slice(), format, &config);
        assert!(
            matches!(result, Err(Error::CorruptData { .. })),
            "{format}: {result:?}"
        );
    }
}

#[test]
fn generator_state_continues_after_reload() {
    for format in SerializableFormat::iter() {
        let mut original = Random::new(2024);
        let mut warmup = Sdr::new(&[50]).unwrap();
        warmup.randomize(0.3, &mut original).unwrap();

        let mut buffer = Vec::new();
        original.save(&mut buffer, format).unwrap();
        let mut restored = Random::load(&mut buffer.as_slice(), format).unwrap();

        let mut a = Sdr::new(&[10, 10]).unwrap();
        let mut b = Sdr::new(&[10, 10]).unwrap();
        a.randomize(0.1, &mut original).unwrap();
        b.randomize(0.1, &mut restored).unwrap();
        assert_eq!(a, b, "{format}");
    }
}
