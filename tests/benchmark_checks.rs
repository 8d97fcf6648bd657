use cdsynth::*;

use std::time::Duration;

fn config(parallel: bool) -> benchmark::Config {
    benchmark::Config {
        replicates: 2,
        timeout: Duration::from_secs(30),
        entry_filter: "".to_owned(),
        parallel,
        backend: menu::Backend::default(),
        search: search::Config::default(),
    }
}

#[test]
fn strings_outcomes_match_expectations() {
    for backend in menu::Backend::all() {
        let config = benchmark::Config {
            backend,
            ..config(true)
        };
        let records =
            benchmark::run(std::path::Path::new("suites/strings/"), &config).unwrap();

        assert_eq!(records.len(), 8);
        for r in records {
            assert_eq!(r.backend, backend);
            assert!(
                r.as_expected,
                "entry '{}' (replicate {}, {:?}) was {}, expected {}",
                r.entry, r.replicate, backend, r.outcome, r.expected
            );
            if r.outcome == "solved" {
                assert!(r.size > 0);
            }
        }
    }
}

#[test]
fn entry_filter_selects_entries() {
    let config = benchmark::Config {
        entry_filter: "pad".to_owned(),
        ..config(false)
    };
    let records = benchmark::run(std::path::Path::new("suites/strings/"), &config).unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.entry == "pad_two"));
    assert_eq!(records[0].suite, "strings");
    assert_eq!(records[1].replicate, 1);
}

#[test]
fn csv_has_one_row_per_run() {
    let mut buf = vec![];
    {
        let config = benchmark::Config {
            entry_filter: "append".to_owned(),
            ..config(false)
        };
        let mut runner = benchmark::Runner::new(config, &mut buf);
        runner.suites(&["suites/strings".into()]).unwrap();
    }
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("suite,entry,replicate,backend,outcome"));
}
