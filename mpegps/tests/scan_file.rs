use std::io::Write;

use anyhow::Result;
use mpegps::process::EXAMPLE_DATA;
use mpegps::process::scan::{ScanOptions, Scanner};
use mpegps::structs::pes::StreamKind;
use mpegps::utils::source::ReaderSource;
use mpegps::{is_program_stream, scan};
use tempfile::NamedTempFile;

const PACK: [u8; 14] = [
    0x00, 0x00, 0x01, 0xBA, 0x44, 0x00, 0x04, 0x00, 0x04, 0x01, 0x00, 0x4E, 0x23, 0xF8,
];

fn pes_with_pts(stream_id: u8, pts: u64, payload_len: usize) -> Vec<u8> {
    let mut out = vec![0x00, 0x00, 0x01, stream_id];
    out.extend_from_slice(&((8 + payload_len) as u16).to_be_bytes());
    out.extend_from_slice(&[
        0x80,
        0x80,
        0x05,
        0x20 | (((pts >> 30) & 0x07) as u8) << 1 | 1,
        ((pts >> 22) & 0xFF) as u8,
        (((pts >> 15) & 0x7F) as u8) << 1 | 1,
        ((pts >> 7) & 0xFF) as u8,
        ((pts & 0x7F) as u8) << 1 | 1,
    ]);
    out.resize(out.len() + payload_len, 0x00);
    out
}

fn write_temp(data: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(data)?;
    file.flush()?;
    Ok(file)
}

#[test]
fn example_file() -> Result<()> {
    let file = write_temp(EXAMPLE_DATA)?;
    assert!(is_program_stream(EXAMPLE_DATA));

    let result = scan(ReaderSource::open(file.path())?);
    assert_eq!(result, scan(EXAMPLE_DATA));
    assert_eq!(result.program_end_code_offset, Some(32));

    Ok(())
}

#[test]
fn file_larger_than_one_chunk() -> Result<()> {
    let mut data = PACK.to_vec();
    let mut packets = 0u64;
    while data.len() < (3 << 20) {
        // One second of 25 fps video per 25 packets.
        data.extend_from_slice(&pes_with_pts(0xE0, packets * 3600, 2000));
        packets += 1;
        if packets % 100 == 0 {
            data.extend_from_slice(&PACK);
        }
    }
    data.extend_from_slice(&[0x00, 0x00, 0x01, 0xB9]);

    let file = write_temp(&data)?;
    let result = scan(ReaderSource::open(file.path())?);

    assert!(result.is_clean(), "{:?}", result.issues);
    assert_eq!(result.file_size, data.len() as u64);
    assert_eq!(result.bytes_scanned, data.len() as u64);
    assert_eq!(result.program_end_code_offset, Some(data.len() as u64 - 4));
    assert_eq!(result.pes.total_packets, packets);

    let video = result.stream(0xE0).expect("video stream");
    assert_eq!(video.kind, StreamKind::Video);
    assert_eq!(video.pts.count, packets);
    let expected = ((packets - 1) * 3600) as f64 / 90_000.0;
    let duration = video.pts.duration_seconds.expect("duration");
    assert!((duration - expected).abs() < 1e-9);

    Ok(())
}

#[test]
fn corrupted_region_in_file() -> Result<()> {
    let mut data = PACK.to_vec();
    for i in 0..50u64 {
        data.extend_from_slice(&pes_with_pts(0xC0, i * 1920, 300));
    }
    let damage = data.len();
    for i in 50..100u64 {
        data.extend_from_slice(&pes_with_pts(0xC0, i * 1920, 300));
    }
    // Clobber the start code of packet 50.
    data[damage + 1] = 0xAA;

    let file = write_temp(&data)?;
    let options = ScanOptions {
        chunk_size: 4096,
        ..Default::default()
    };
    let result = Scanner::with_options(ReaderSource::open(file.path())?, options).run();

    assert_eq!(result.issues.len(), 1);
    assert!(result.issues[0].starts_with(&format!("Lost sync at offset {damage}")));
    assert_eq!(result.pes.total_packets, 99);
    assert_eq!(result.program_end_code_offset, None);

    Ok(())
}

#[test]
fn not_a_program_stream() {
    assert!(!is_program_stream(b"RIFF\x24\x00\x00\x00WAVE"));
    assert!(!is_program_stream(&[0x00, 0x00, 0x01]));
}
