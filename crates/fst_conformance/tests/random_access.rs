//! Random access agrees with the emitted history at every time, whatever
//! order the queries come in.

use fst_common::{Handle, VarType};
use fst_conformance::{
    expected_changes, value_bytes, value_in_model, write_script, Change, Decl, Script, Step,
};
use fst_config::WriterConfig;
use fst_reader::Reader;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

struct Signal {
    handle: Handle,
    unset: Vec<u8>,
}

/// Fixed-width signals only: a bit, two vectors and a real.
fn counter_script(seed: u64) -> (Script, Vec<Signal>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut script = Script::new();
    let bit = script.declare(Decl::new("bit", VarType::Wire, 1));
    let nib = script.declare(Decl::new("nib", VarType::Reg, 4));
    let word = script.declare(Decl::new("word", VarType::Integer, 32));
    let real = script.declare(Decl::new("real", VarType::Real, 64));

    let mut time = 0;
    script.step(Step::Time(time));
    for i in 0..400u32 {
        match rng.gen_range(0..6) {
            0 => {
                time += rng.gen_range(1..3);
                script.step(Step::Time(time));
            }
            1 => {
                let v = if rng.gen_bool(0.9) { b"1" } else { b"x" };
                script.step(Step::Value(bit, v.to_vec()));
            }
            2 => {
                script.step(Step::Value(nib, format!("{:04b}", i % 16).into_bytes()));
            }
            3 => {
                script.step(Step::Value(word, format!("{:032b}", rng.gen::<u32>()).into_bytes()));
            }
            4 => {
                script.step(Step::Real(real, f64::from(i) * 0.25));
            }
            _ => {
                script.step(Step::Value(bit, b"0".to_vec()));
            }
        }
    }

    let handles = script.handles();
    let signals = vec![
        Signal {
            handle: handles[bit],
            unset: b"x".to_vec(),
        },
        Signal {
            handle: handles[nib],
            unset: b"xxxx".to_vec(),
        },
        Signal {
            handle: handles[word],
            unset: vec![b'x'; 32],
        },
        Signal {
            handle: handles[real],
            unset: f64::NAN.to_ne_bytes().to_vec(),
        },
    ];
    (script, signals)
}

fn small_blocks() -> WriterConfig {
    WriterConfig {
        break_size: 200,
        ..WriterConfig::default()
    }
}

fn query(reader: &mut Reader, time: u64, handle: Handle) -> Vec<u8> {
    let value = reader.value_at(time, handle).unwrap().unwrap();
    value_bytes(value.as_value())
}

fn check_all_times(reader: &mut Reader, changes: &[Change], signals: &[Signal]) {
    let end = reader.end_time();
    for signal in signals {
        for t in 0..=end + 2 {
            assert_eq!(
                query(reader, t, signal.handle),
                value_in_model(changes, signal.handle, t, &signal.unset),
                "handle {} at {t}",
                signal.handle
            );
        }
    }
}

#[test]
fn every_time_matches_the_history() {
    let (script, signals) = counter_script(21);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rvat.fst");
    write_script(&path, &small_blocks(), &script).unwrap();
    let changes = expected_changes(&script);

    let mut reader = Reader::open(&path).unwrap();
    assert!(reader.block_count() > 2, "want several blocks");
    check_all_times(&mut reader, &changes, &signals);
}

#[test]
fn interleaved_handles_share_the_cache() {
    let (script, signals) = counter_script(22);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rvat.fst");
    write_script(&path, &small_blocks(), &script).unwrap();
    let changes = expected_changes(&script);

    let mut reader = Reader::open(&path).unwrap();
    let end = reader.end_time();
    for t in 0..=end {
        for signal in &signals {
            assert_eq!(
                query(&mut reader, t, signal.handle),
                value_in_model(&changes, signal.handle, t, &signal.unset)
            );
        }
    }
}

#[test]
fn answers_do_not_depend_on_query_order() {
    let (script, signals) = counter_script(23);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rvat.fst");
    write_script(&path, &small_blocks(), &script).unwrap();

    let mut warm = Reader::open(&path).unwrap();
    let end = warm.end_time();
    let mut queries: Vec<(u64, usize)> = (0..=end)
        .flat_map(|t| (0..signals.len()).map(move |s| (t, s)))
        .collect();
    queries.shuffle(&mut StdRng::seed_from_u64(99));

    for (t, s) in queries {
        let handle = signals[s].handle;
        let mut cold = Reader::open(&path).unwrap();
        assert_eq!(
            query(&mut warm, t, handle),
            query(&mut cold, t, handle),
            "handle {handle} at {t}"
        );
    }
}

#[test]
fn block_end_returns_the_value_at_that_instant() {
    let mut script = Script::new();
    let sig = script.declare(Decl::new("sig", VarType::Wire, 2));
    for t in 0..12u64 {
        script.step(Step::Time(t));
        script.step(Step::Value(sig, format!("{:02b}", t % 4).into_bytes()));
        if t % 4 == 3 {
            script.step(Step::Flush);
        }
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("edges.fst");
    write_script(&path, &WriterConfig::default(), &script).unwrap();

    let mut reader = Reader::open(&path).unwrap();
    assert_eq!(reader.block_count(), 3);
    let handle = Handle::from_raw(1);
    for t in [3, 4, 7, 8, 11, 50] {
        let want = format!("{:02b}", t.min(11) % 4).into_bytes();
        assert_eq!(query(&mut reader, t, handle), want, "t = {t}");
    }
}

#[test]
fn time_before_the_trace_has_no_value() {
    let mut script = Script::new();
    let sig = script.declare(Decl::new("sig", VarType::Wire, 1));
    script
        .step(Step::Time(10))
        .step(Step::Value(sig, b"1".to_vec()))
        .step(Step::Time(20));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("late.fst");
    write_script(&path, &WriterConfig::default(), &script).unwrap();

    let mut reader = Reader::open(&path).unwrap();
    assert_eq!(reader.value_at(5, Handle::from_raw(1)).unwrap(), None);
    assert_eq!(query(&mut reader, 10, Handle::from_raw(1)), b"1".to_vec());
}
