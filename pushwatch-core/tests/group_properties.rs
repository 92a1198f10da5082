//! Watch-group partition properties over generated file sets.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use proptest::prelude::*;
use pushwatch_core::{build_watch_groups, Protocol, RemoteConfig};

fn base() -> RemoteConfig {
    RemoteConfig {
        host: "example.com".into(),
        username: "deploy".into(),
        password: "pw".into(),
        port: None,
        protocol: Protocol::Sftp,
        remote_path: "/www".into(),
        transfer_files: vec![],
    }
}

fn rel_file() -> impl Strategy<Value = PathBuf> {
    (
        proptest::collection::vec(prop_oneof!["a", "b", "c/d", "e"], 0..3),
        "[a-z]{1,4}\\.(js|css)",
    )
        .prop_map(|(dirs, name)| {
            let mut p = PathBuf::new();
            for d in dirs {
                p.push(d);
            }
            p.push(name);
            p
        })
}

proptest! {
    #[test]
    fn every_input_lands_in_exactly_one_group(files in proptest::collection::vec(rel_file(), 1..12)) {
        let root = Path::new("/proj");
        let groups = build_watch_groups(root, &files, &base()).expect("groups");

        let expected: BTreeSet<PathBuf> = files.iter().map(|f| root.join(f)).collect();
        let mut seen = BTreeSet::new();
        for group in &groups {
            for target in &group.target_files {
                prop_assert!(seen.insert(target.clone()), "duplicate target {}", target.display());
                prop_assert_eq!(target.parent(), Some(group.directory.as_path()));
            }
        }
        prop_assert_eq!(seen, expected);

        let dirs: BTreeSet<_> = groups.iter().map(|g| g.directory.clone()).collect();
        prop_assert_eq!(dirs.len(), groups.len());
    }

    #[test]
    fn group_remote_path_mirrors_directory(files in proptest::collection::vec(rel_file(), 1..12)) {
        let root = Path::new("/proj");
        for group in build_watch_groups(root, &files, &base()).expect("groups") {
            let rel = group.directory.strip_prefix(root).expect("under root");
            let rel = rel.to_string_lossy().replace('\\', "/");
            let expected = if rel.is_empty() { "/www".to_string() } else { format!("/www/{rel}") };
            prop_assert_eq!(group.config.remote_path, expected);
        }
    }
}
