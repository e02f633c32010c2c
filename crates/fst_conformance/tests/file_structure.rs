//! Optional sections, fallbacks and writer settings seen through the reader.

use std::fs;

use fst_common::{BlockKind, Handle, PackType, SignalKind, VarType};
use fst_conformance::{expected_changes, record, strip_blocks, write_script, Decl, Script, Step};
use fst_config::{load_config_from_str, WriterConfig};
use fst_reader::{OwnedValue, Reader, ReaderError};
use fst_writer::{sidecar_path, WriterError};

fn mixed_script() -> Script {
    let mut script = Script::new();
    let a = script.declare(Decl::new("a", VarType::Wire, 1));
    let bus = script.declare(Decl::new("bus", VarType::Reg, 12));
    script.declare(Decl::alias("bus_copy", VarType::Reg, 12, bus));
    let r = script.declare(Decl::new("r", VarType::RealTime, 64));
    let s = script.declare(Decl::new("s", VarType::GenString, 0));
    let p = script.declare(Decl::new("p", VarType::Port, 11));
    for t in 0..40u64 {
        script.step(Step::Time(t * 3));
        script.step(Step::Value(a, if t % 2 == 0 { b"0" } else { b"1" }.to_vec()));
        script.step(Step::Value(bus, format!("{:012b}", t * 37).into_bytes()));
        if t % 5 == 0 {
            script.step(Step::Real(r, t as f64 / 3.0));
            script.step(Step::VarLen(s, format!("step {t}").into_bytes()));
            script.step(Step::Value(p, format!("{:011b}", t).into_bytes()));
        }
    }
    script
}

fn small_blocks() -> WriterConfig {
    WriterConfig {
        break_size: 300,
        ..WriterConfig::default()
    }
}

#[test]
fn missing_geometry_is_rebuilt_from_hierarchy() {
    let script = mixed_script();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nogeom.fst");
    write_script(&path, &small_blocks(), &script).unwrap();

    let mut with_geometry = Reader::open(&path).unwrap();
    let kinds: Vec<_> = (1..=5)
        .map(|h| with_geometry.signal_kind(Handle::from_raw(h)))
        .collect();
    let vcd = with_geometry.write_vcd(Vec::new()).unwrap();

    assert_eq!(strip_blocks(&path, BlockKind::Geometry).unwrap(), 1);
    let mut replayed = Reader::open(&path).unwrap();
    let replayed_kinds: Vec<_> = (1..=5)
        .map(|h| replayed.signal_kind(Handle::from_raw(h)))
        .collect();
    assert_eq!(replayed_kinds, kinds);
    assert_eq!(
        kinds,
        vec![
            Some(SignalKind::Bits),
            Some(SignalKind::Bits),
            Some(SignalKind::Real),
            Some(SignalKind::VarLen),
            Some(SignalKind::Bits),
        ]
    );
    assert_eq!(replayed.max_handle(), 5);
    assert_eq!(record(&mut replayed).unwrap().changes, expected_changes(&script));
    assert_eq!(replayed.write_vcd(Vec::new()).unwrap(), vcd);
}

#[test]
fn port_width_is_reported_in_bits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("port.fst");
    write_script(&path, &WriterConfig::default(), &mixed_script()).unwrap();
    let mut reader = Reader::open(&path).unwrap();
    let signals = reader.process_hierarchy(None).unwrap();
    let port = signals.iter().find(|s| s.name == "top.p").unwrap();
    assert_eq!(port.width, 3);
    let vcd = String::from_utf8(reader.write_vcd(Vec::new()).unwrap()).unwrap();
    assert!(vcd.contains("$var port 3 % p $end"));
    assert!(vcd.contains("p00000000101 %"));
}

#[test]
fn hierarchy_sidecar_is_kept_and_read() {
    let config = WriterConfig {
        compress_hierarchy: false,
        ..WriterConfig::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("side.fst");
    write_script(&path, &config, &mixed_script()).unwrap();
    assert!(sidecar_path(&path).exists());

    let mut reader = Reader::open(&path).unwrap();
    let names: Vec<String> = reader
        .process_hierarchy(None)
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(
        names,
        vec!["top.a", "top.bus", "top.bus_copy", "top.r", "top.s", "top.p"]
    );
    assert_eq!(reader.alias_count(), 1);
}

#[test]
fn compressed_hierarchy_removes_the_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("packed.fst");
    write_script(&path, &WriterConfig::default(), &mixed_script()).unwrap();
    assert!(!sidecar_path(&path).exists());
}

#[test]
fn repacked_file_is_wrapped_and_readable() {
    let config = WriterConfig {
        repack_on_close: true,
        ..small_blocks()
    };
    let script = mixed_script();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wrapped.fst");
    write_script(&path, &config, &script).unwrap();
    assert_eq!(fs::read(&path).unwrap()[0], BlockKind::Wrapper.tag());

    let mut reader = Reader::open(&path).unwrap();
    assert_eq!(reader.end_time(), 39 * 3);
    assert_eq!(record(&mut reader).unwrap().changes, expected_changes(&script));
}

#[test]
fn dump_transitions_interleave_with_times() {
    let mut script = Script::new();
    let a = script.declare(Decl::new("a", VarType::Wire, 1));
    script
        .step(Step::Time(0))
        .step(Step::Value(a, b"0".to_vec()))
        .step(Step::Time(4))
        .step(Step::DumpActive(false))
        .step(Step::Time(9))
        .step(Step::DumpActive(true))
        .step(Step::Value(a, b"1".to_vec()));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.fst");
    write_script(&path, &WriterConfig::default(), &script).unwrap();

    let mut reader = Reader::open(&path).unwrap();
    assert_eq!(reader.blackouts(), &[(4, false), (9, true)]);
    let seen = record(&mut reader).unwrap();
    assert_eq!(seen.times, vec![0, 4, 9]);
    assert_eq!(seen.dumps, vec![(4, false), (9, true)]);

    let vcd = String::from_utf8(reader.write_vcd(Vec::new()).unwrap()).unwrap();
    assert!(vcd.ends_with("#0\n0!\n#4\n$dumpoff\n#9\n$dumpon\n1!\n"));
}

#[test]
fn dump_size_limit_stops_after_the_crossing_block() {
    let script = mixed_script();
    let dir = tempfile::tempdir().unwrap();

    let full_path = dir.path().join("full.fst");
    write_script(&full_path, &small_blocks(), &script).unwrap();
    let full = Reader::open(&full_path).unwrap();

    let limited_path = dir.path().join("limited.fst");
    let config = WriterConfig {
        dump_size_limit: 400,
        ..small_blocks()
    };
    write_script(&limited_path, &config, &script).unwrap();
    let mut limited = Reader::open(&limited_path).unwrap();

    assert!(full.block_count() > 1);
    assert_eq!(limited.block_count(), 1);
    let end = limited.end_time();
    assert!(end < full.end_time());
    let want: Vec<_> = expected_changes(&script)
        .into_iter()
        .filter(|c| c.time <= end)
        .collect();
    assert_eq!(record(&mut limited).unwrap().changes, want);
}

#[test]
fn time_limit_starts_with_the_block_frame() {
    let mut script = Script::new();
    let cnt = script.declare(Decl::new("cnt", VarType::Reg, 4));
    let flag = script.declare(Decl::new("flag", VarType::Wire, 1));
    for t in 0..10u64 {
        script.step(Step::Time(t));
        if t == 0 {
            script.step(Step::Value(flag, b"1".to_vec()));
        }
        script.step(Step::Value(cnt, format!("{t:04b}").into_bytes()));
        if t == 3 || t == 6 {
            script.step(Step::Flush);
        }
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("limit.fst");
    write_script(&path, &WriterConfig::default(), &script).unwrap();

    let mut reader = Reader::open(&path).unwrap();
    assert_eq!(reader.block_count(), 3);
    reader.set_limit_time_range(5, 7);
    let seen = record(&mut reader).unwrap();
    assert_eq!(seen.times, vec![3, 5, 6, 7]);
    let got: Vec<_> = seen
        .changes
        .iter()
        .map(|c| (c.time, c.handle, String::from_utf8(c.bytes.clone()).unwrap()))
        .collect();
    assert_eq!(
        got,
        vec![
            (3, 1, "0011".to_string()),
            (3, 2, "1".to_string()),
            (5, 1, "0101".to_string()),
            (6, 1, "0110".to_string()),
            (7, 1, "0111".to_string()),
        ]
    );

    reader.clear_mask_all();
    reader.set_mask(Handle::from_raw(2));
    let seen = record(&mut reader).unwrap();
    assert!(seen.changes.iter().all(|c| c.handle == 2));
    assert_eq!(seen.changes.len(), 1);

    reader.set_mask_all();
    reader.set_unlimited_time_range();
    assert_eq!(record(&mut reader).unwrap().changes, expected_changes(&script));
}

#[test]
fn backwards_time_is_rejected() {
    let mut script = Script::new();
    let a = script.declare(Decl::new("a", VarType::Wire, 1));
    script
        .step(Step::Time(10))
        .step(Step::Value(a, b"1".to_vec()))
        .step(Step::Time(9));
    let dir = tempfile::tempdir().unwrap();
    let err = write_script(&dir.path().join("back.fst"), &WriterConfig::default(), &script)
        .unwrap_err();
    assert!(matches!(
        err,
        WriterError::TimeWentBackwards {
            previous: 10,
            requested: 9
        }
    ));
}

#[test]
fn undeclared_handle_is_rejected() {
    let mut script = Script::new();
    script.declare(Decl::new("a", VarType::Wire, 1));
    script.step(Step::Time(0)).step(Step::Value(7, b"1".to_vec()));
    let dir = tempfile::tempdir().unwrap();
    let err = write_script(&dir.path().join("bad.fst"), &WriterConfig::default(), &script)
        .unwrap_err();
    assert!(matches!(err, WriterError::UnknownHandle(_)));
}

#[test]
fn config_file_settings_reach_the_trace() {
    let config = load_config_from_str(
        r#"
[writer]
pack = "lz4"
timescale = "10ns"
version = "conformance"
break_size = 400
"#,
    )
    .unwrap()
    .writer;
    assert_eq!(config.pack, PackType::Lz4);

    let script = mixed_script();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("configured.fst");
    write_script(&path, &config, &script).unwrap();

    let mut reader = Reader::open(&path).unwrap();
    assert_eq!(reader.timescale(), -8);
    assert_eq!(reader.version(), "conformance");
    assert_eq!(reader.memory_used(), 400);
    assert_eq!(record(&mut reader).unwrap().changes, expected_changes(&script));
    assert_eq!(
        reader.value_at(3 * 39, Handle::from_raw(2)).unwrap(),
        Some(OwnedValue::Bits(format!("{:012b}", 39 * 37).into_bytes()))
    );
}

#[test]
fn corrupt_time_trailer_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.fst");
    write_script(&path, &WriterConfig::default(), &mixed_script()).unwrap();

    let mut data = fs::read(&path).unwrap();
    let pos = 330;
    assert!(BlockKind::from_tag(data[pos]).unwrap().is_value_change());
    let seclen = u64::from_be_bytes(data[pos + 1..pos + 9].try_into().unwrap()) as usize;
    let end = pos + 1 + seclen;
    data[end - 8..end].copy_from_slice(&(u64::MAX / 2).to_be_bytes());
    fs::write(&path, &data).unwrap();

    let mut reader = Reader::open(&path).unwrap();
    assert!(matches!(
        reader.for_each_change(|_, _, _| {}),
        Err(ReaderError::CorruptBlock { .. })
    ));
    assert!(matches!(
        reader.value_at(3, Handle::from_raw(1)),
        Err(ReaderError::CorruptBlock { .. })
    ));
}

#[test]
fn oversized_frame_length_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.fst");
    write_script(&path, &WriterConfig::default(), &mixed_script()).unwrap();

    // Frame lengths are varints right after the 33-byte block preamble.
    let mut data = fs::read(&path).unwrap();
    let frame = 330 + 33;
    let uclen = data[frame];
    assert!(uclen < 0x80);
    let mut patched = data[..frame + 1].to_vec();
    patched.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
    let old_clen_len = data[frame + 1..].iter().position(|b| b & 0x80 == 0).unwrap() + 1;
    patched.extend_from_slice(&data[frame + 1 + old_clen_len..]);
    // Keep the block length consistent so only the frame field is wrong.
    let grown = patched.len() - data.len();
    let seclen = u64::from_be_bytes(data[331..339].try_into().unwrap()) + grown as u64;
    patched[331..339].copy_from_slice(&seclen.to_be_bytes());
    data = patched;
    fs::write(&path, &data).unwrap();

    let mut reader = Reader::open(&path).unwrap();
    assert!(matches!(
        reader.for_each_change(|_, _, _| {}),
        Err(ReaderError::CorruptBlock { .. })
    ));
}
