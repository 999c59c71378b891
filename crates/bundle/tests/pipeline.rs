//! End-to-end bundle pipeline tests: encode a small history through a real
//! sled-backed store and check the produced bytes.

use sha1::{Digest, Sha1};

use ferry_bundle::{create_bundle, encode, BundleOutcome, BundleVersion, CapabilitySet};
use ferry_core::{ChangesetContent, CommitRecord, GitCommitId, HgChangesetId};
use ferry_store::{MemorySource, TranslationStore};

fn oid(b: u8) -> GitCommitId {
    GitCommitId::from_bytes([b; 20])
}

fn content(desc: &str, files: &[&str]) -> ChangesetContent {
    ChangesetContent {
        author: b"Ada <ada@example.com>".to_vec(),
        timestamp: 1700000000,
        utcoffset: -7200,
        extra: Default::default(),
        files: files.iter().map(|f| f.as_bytes().to_vec()).collect(),
        description: desc.as_bytes().to_vec(),
    }
}

/// A three-commit linear history plus its content source.
fn linear_history() -> (Vec<CommitRecord>, MemorySource) {
    let commits = vec![
        CommitRecord::root(oid(1)),
        CommitRecord::new(oid(2), [oid(1)]),
        CommitRecord::new(oid(3), [oid(2)]),
    ];
    let mut source = MemorySource::new();
    source.insert(oid(1), content("root", &["a.txt"]), [0x11; 20]);
    source.insert(oid(2), content("second", &["a.txt", "b.txt"]), [0x22; 20]);
    source.insert(oid(3), content("third", &["b.txt"]), [0x33; 20]);
    (commits, source)
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes(data[at..at + 4].try_into().unwrap())
}

/// One decoded changeset chunk of a raw `01` changegroup stream.
struct Cg01Chunk {
    node: [u8; 20],
    p1: [u8; 20],
    p2: [u8; 20],
    delta_start: u32,
    delta_end: u32,
    data: Vec<u8>,
}

/// Parse the changeset group of a raw `01` changegroup stream.
fn parse_cg01(data: &[u8]) -> Vec<Cg01Chunk> {
    let mut chunks = Vec::new();
    let mut at = 0;
    loop {
        let len = read_u32(data, at) as usize;
        at += 4;
        if len == 0 {
            break;
        }
        let chunk = &data[at..at + len - 4];
        // node, p1, p2, linknode, then the single patch op.
        let delta_len = read_u32(chunk, 88) as usize;
        chunks.push(Cg01Chunk {
            node: chunk[0..20].try_into().unwrap(),
            p1: chunk[20..40].try_into().unwrap(),
            p2: chunk[40..60].try_into().unwrap(),
            delta_start: read_u32(chunk, 80),
            delta_end: read_u32(chunk, 84),
            data: chunk[92..92 + delta_len].to_vec(),
        });
        at += len - 4;
    }
    chunks
}

/// Apply each chunk's patch op against its implicit base, the previous
/// chunk's text (empty for the first), yielding every full text.
fn apply_cg01_deltas(chunks: &[Cg01Chunk]) -> Vec<Vec<u8>> {
    let mut base: Vec<u8> = Vec::new();
    let mut texts = Vec::new();
    for chunk in chunks {
        let start = chunk.delta_start as usize;
        let end = chunk.delta_end as usize;
        let mut text = Vec::with_capacity(base.len() - (end - start) + chunk.data.len());
        text.extend_from_slice(&base[..start]);
        text.extend_from_slice(&chunk.data);
        text.extend_from_slice(&base[end..]);
        base.clone_from(&text);
        texts.push(text);
    }
    texts
}

#[test]
fn v1_bundle_is_raw_changegroup_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let (commits, source) = linear_history();
    let mut store = TranslationStore::open(&dir.path().join("store")).unwrap();

    let path = dir.path().join("out.hg");
    let outcome =
        create_bundle(&mut store, &source, &commits, BundleVersion::V1, &path).unwrap();
    assert_eq!(outcome, BundleOutcome::Written { changesets: 3 });

    let bytes = std::fs::read(&path).unwrap();
    // No container magic: the stream starts with the first chunk length.
    assert_ne!(&bytes[..4], b"HG20");

    let chunks = parse_cg01(&bytes);
    assert_eq!(chunks.len(), 3);

    // Chunk order equals input order, and parent links chain through it.
    let nodes: Vec<[u8; 20]> = chunks.iter().map(|c| c.node).collect();
    assert_eq!(chunks[0].p1, [0; 20]);
    assert_eq!(chunks[1].p1, nodes[0]);
    assert_eq!(chunks[2].p1, nodes[1]);
    assert!(chunks.iter().all(|c| c.p2 == [0; 20]));

    // Recorded translations match the encoded nodes.
    for (record, node) in commits.iter().zip(&nodes) {
        let translated = store.lookup(record.id).unwrap().unwrap();
        assert_eq!(translated.changeset.as_bytes(), node);
    }
    store.close(false).unwrap();
}

#[test]
fn replaying_bundle_against_fresh_store_reproduces_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let (commits, source) = linear_history();

    let path = dir.path().join("out.hg");
    let mut store = TranslationStore::open(&dir.path().join("store_a")).unwrap();
    create_bundle(&mut store, &source, &commits, BundleVersion::V1, &path).unwrap();
    store.close(false).unwrap();
    drop(store);

    let encoded: Vec<[u8; 20]> = parse_cg01(&std::fs::read(&path).unwrap())
        .iter()
        .map(|c| c.node)
        .collect();

    // A fresh store translating the same commits lands on the same nodes.
    let mut fresh = TranslationStore::open(&dir.path().join("store_b")).unwrap();
    for (record, node) in commits.iter().zip(&encoded) {
        let translated = fresh.resolve_or_create(record, &source).unwrap();
        assert_eq!(translated.changeset.as_bytes(), node);
    }
    fresh.close(false).unwrap();
}

#[test]
fn two_rolled_back_runs_yield_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let (commits, source) = linear_history();

    let run = |store_name: &str, out_name: &str| {
        let mut store = TranslationStore::open(&dir.path().join(store_name)).unwrap();
        let path = dir.path().join(out_name);
        create_bundle(&mut store, &source, &commits, BundleVersion::V2, &path).unwrap();
        store.close(false).unwrap();
        std::fs::read(&path).unwrap()
    };

    assert_eq!(run("store_a", "a.hg"), run("store_b", "b.hg"));
}

#[test]
fn v2_bundle_declares_version_and_capabilities() {
    let dir = tempfile::tempdir().unwrap();
    let (commits, source) = linear_history();
    let mut store = TranslationStore::open(&dir.path().join("store")).unwrap();

    let path = dir.path().join("out.hg");
    create_bundle(&mut store, &source, &commits, BundleVersion::V2, &path).unwrap();
    store.close(false).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], b"HG20");
    let params_len = read_u32(&bytes, 4) as usize;
    let params = String::from_utf8(bytes[8..8 + params_len].to_vec()).unwrap();
    assert_eq!(params, "capabilities=HG20%0Achangegroup%3D01%2C02");
}

#[test]
fn empty_range_writes_nothing_and_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = TranslationStore::open(&dir.path().join("store")).unwrap();
    let source = MemorySource::new();

    let path = dir.path().join("out.hg");
    std::fs::write(&path, b"pre-existing").unwrap();

    let outcome =
        create_bundle(&mut store, &source, &[], BundleVersion::V2, &path).unwrap();
    assert_eq!(outcome, BundleOutcome::Empty);
    // The existing file is untouched.
    assert_eq!(std::fs::read(&path).unwrap(), b"pre-existing");
    store.close(false).unwrap();
}

#[test]
fn encode_empty_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = TranslationStore::open(&dir.path().join("store")).unwrap();
    let source = MemorySource::new();

    let bundle = encode(
        &[],
        &mut store,
        &source,
        BundleVersion::V2,
        CapabilitySet::v2_default(),
    )
    .unwrap();
    assert!(bundle.is_none());
    store.close(false).unwrap();
}

#[test]
fn failed_build_rolls_back_store_and_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let (commits, _) = linear_history();

    // Content for the first commit only: the second resolve fails.
    let mut source = MemorySource::new();
    source.insert(oid(1), content("root", &["a.txt"]), [0x11; 20]);

    let path = dir.path().join("out.hg");
    let store_dir = dir.path().join("store");
    {
        let mut store = TranslationStore::open(&store_dir).unwrap();
        let result = create_bundle(&mut store, &source, &commits, BundleVersion::V2, &path);
        assert!(result.is_err());
        assert!(store.is_closed());
    }
    assert!(!path.exists());

    // Nothing leaked into the durable mapping.
    let store = TranslationStore::open(&store_dir).unwrap();
    assert_eq!(store.lookup(oid(1)).unwrap(), None);
}

#[test]
fn merge_history_encodes_both_parent_slots() {
    let dir = tempfile::tempdir().unwrap();
    let commits = vec![
        CommitRecord::root(oid(1)),
        CommitRecord::root(oid(2)),
        CommitRecord::new(oid(3), [oid(1), oid(2)]),
    ];
    let mut source = MemorySource::new();
    source.insert(oid(1), content("left", &["l.txt"]), [0x11; 20]);
    source.insert(oid(2), content("right", &["r.txt"]), [0x22; 20]);
    source.insert(oid(3), content("merge", &[]), [0x33; 20]);

    let mut store = TranslationStore::open(&dir.path().join("store")).unwrap();
    let path = dir.path().join("out.hg");
    create_bundle(&mut store, &source, &commits, BundleVersion::V1, &path).unwrap();

    let chunks = parse_cg01(&std::fs::read(&path).unwrap());
    let merge = &chunks[2];
    assert_eq!(merge.p1, chunks[0].node);
    assert_eq!(merge.p2, chunks[1].node);
    store.close(false).unwrap();
}

#[test]
fn v1_delta_chain_reconstructs_recorded_changesets() {
    let dir = tempfile::tempdir().unwrap();
    let (commits, source) = linear_history();
    let mut store = TranslationStore::open(&dir.path().join("store")).unwrap();

    let path = dir.path().join("out.hg");
    create_bundle(&mut store, &source, &commits, BundleVersion::V1, &path).unwrap();

    let chunks = parse_cg01(&std::fs::read(&path).unwrap());
    let texts = apply_cg01_deltas(&chunks);
    assert_eq!(texts.len(), 3);

    for (chunk, text) in chunks.iter().zip(&texts) {
        // Patching against the previous text yields exactly the changeset
        // the store recorded for that node.
        let node = HgChangesetId::from_bytes(chunk.node);
        let recorded = store.changeset(node).unwrap();
        assert_eq!(text.as_slice(), recorded.raw.as_bytes());

        // And the node is recomputable from wire data alone.
        let (lo, hi) = if chunk.p1 <= chunk.p2 {
            (chunk.p1, chunk.p2)
        } else {
            (chunk.p2, chunk.p1)
        };
        let mut hasher = Sha1::new();
        hasher.update(lo);
        hasher.update(hi);
        hasher.update(text);
        let computed: [u8; 20] = hasher.finalize().into();
        assert_eq!(computed, chunk.node);
    }
    store.close(false).unwrap();
}
