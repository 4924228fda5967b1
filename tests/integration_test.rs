// Integration tests for jaccard-index

use jaccard_index::output::{links_to_table, table_to_csv};
use jaccard_index::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn logs() -> HashMap<String, Vec<&'static str>> {
    HashMap::from([
        ("item1".to_string(), vec!["user1", "user2"]),
        ("item2".to_string(), vec!["user2", "user3", "user4"]),
        ("item3".to_string(), vec!["user1", "user2", "user5"]),
    ])
}

fn items() -> Vec<String> {
    vec!["item1".to_string(), "item2".to_string(), "item3".to_string()]
}

fn expected_matrix() -> Matrix {
    vec![
        ("item1", "item2", 0.25),
        ("item1", "item3", 2.0 / 3.0),
        ("item2", "item1", 0.25),
        ("item2", "item3", 0.2),
        ("item3", "item1", 2.0 / 3.0),
        ("item3", "item2", 0.2),
    ]
    .into_iter()
    .collect()
}

fn link(source: &str, target: &str, value: f64) -> Link<String> {
    Link::new(source.to_string(), target.to_string(), value)
}

fn builder() -> JaccardBuilder<String> {
    let logs = logs();
    JaccardBuilder::new().loader_fn(move |id: &String| logs.get(id).cloned())
}

fn counting_builder(calls: Arc<AtomicUsize>) -> JaccardBuilder<String> {
    builder().score_fn(move |source, target| {
        calls.fetch_add(1, Ordering::SeqCst);
        source.jaccard(target)
    })
}

#[tokio::test]
async fn test_synopsis_matrix() {
    let logs: HashMap<&str, Vec<&str>> = HashMap::from([
        ("foo", vec!["user1", "user2"]),
        ("bar", vec!["user2", "user3", "user4"]),
        ("buz", vec!["user1", "user2", "user5"]),
    ]);
    let engine = JaccardBuilder::<&'static str>::new()
        .expire(1000)
        .loader_fn(move |id: &&str| logs.get(id).cloned())
        .filter(Round(3))
        .build()
        .unwrap();

    let matrix = engine.matrix(vec!["foo", "bar", "buz"], None).await.unwrap();
    let expected: Matrix = vec![
        ("foo", "bar", 0.25),
        ("foo", "buz", 0.667),
        ("bar", "foo", 0.25),
        ("bar", "buz", 0.2),
        ("buz", "foo", 0.667),
        ("buz", "bar", 0.2),
    ]
    .into_iter()
    .collect();
    assert_eq!(matrix, expected);
}

#[tokio::test]
async fn test_get_index_and_cached_index() {
    let engine = builder().expire(1000).build().unwrap();
    let item1 = "item1".to_string();
    let item2 = "item2".to_string();
    let item3 = "item3".to_string();

    assert_eq!(engine.get_index(&item1, &item2).await.unwrap(), Some(0.25));
    assert_eq!(engine.cached_index(&item2, &item3).await.unwrap(), Some(0.2));
    assert_eq!(engine.cached_index(&item3, &item1).await.unwrap(), Some(2.0 / 3.0));
}

#[tokio::test]
async fn test_get_links() {
    let engine = builder().build().unwrap();
    let links = engine.links(items(), None).await.unwrap();
    assert_eq!(
        links,
        vec![
            link("item1", "item2", 0.25),
            link("item1", "item3", 2.0 / 3.0),
            link("item2", "item3", 0.2),
        ]
    );
}

#[tokio::test]
async fn test_get_matrix() {
    let engine = builder().expire(1000).build().unwrap();
    assert_eq!(engine.matrix(items(), None).await.unwrap(), expected_matrix());
}

#[tokio::test]
async fn test_matrix_with_targets() {
    let engine = builder().expire(1000).build().unwrap();

    let matrix = engine
        .matrix(vec!["item1".to_string()], Some(items().into()))
        .await
        .unwrap();
    let expected: Matrix = vec![("item1", "item2", 0.25), ("item1", "item3", 2.0 / 3.0)]
        .into_iter()
        .collect();
    assert_eq!(matrix, expected);

    let matrix = engine
        .matrix(vec!["item2".to_string()], Some(items().into()))
        .await
        .unwrap();
    assert_eq!(matrix.len(), 1);
    assert_eq!(matrix.get("item2", "item1"), Some(0.25));
    assert_eq!(matrix.get("item2", "item3"), Some(0.2));
}

#[tokio::test]
async fn test_direction_true_scores_every_ordering() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = counting_builder(calls.clone()).direction(true).build().unwrap();
    let links = engine.links(items(), None).await.unwrap();
    assert_eq!(
        links,
        vec![
            link("item1", "item2", 0.25),
            link("item1", "item3", 2.0 / 3.0),
            link("item2", "item1", 0.25),
            link("item2", "item3", 0.2),
            link("item3", "item1", 2.0 / 3.0),
            link("item3", "item2", 0.2),
        ]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_direction_false_scores_each_pair_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = counting_builder(calls.clone()).build().unwrap();
    let links = engine.links(items(), None).await.unwrap();
    assert_eq!(links.len(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let calls = Arc::new(AtomicUsize::new(0));
    let engine = counting_builder(calls.clone()).build().unwrap();
    assert_eq!(engine.matrix(items(), None).await.unwrap(), expected_matrix());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_async_loader() {
    let logs = Arc::new(logs());
    let engine = JaccardBuilder::<String>::new()
        .expire(1000)
        .async_loader(move |id: String| {
            let logs = logs.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok(logs.get(&id).cloned())
            }
        })
        .build()
        .unwrap();
    assert_eq!(engine.matrix(items(), None).await.unwrap(), expected_matrix());
}

#[tokio::test]
async fn test_deferred_items() {
    let engine = builder().items_fn(items).build().unwrap();
    let deferred: Task<(), Vec<String>> = Task::from_async(|()| async { Ok(items()) });

    let all = engine.links(Items::All, None).await.unwrap();
    let from_task = engine.links(deferred, None).await.unwrap();
    assert_eq!(all, from_task);
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_round_filter() {
    let engine = builder().filter(Round(3)).build().unwrap();
    let matrix = engine.matrix(items(), None).await.unwrap();
    assert_eq!(matrix.get("item1", "item3"), Some(0.667));
    assert_eq!(matrix.get("item3", "item1"), Some(0.667));
    assert_eq!(matrix.get("item1", "item2"), Some(0.25));
}

#[tokio::test]
async fn test_filter_drops_pair_from_links_and_matrix() {
    let engine = builder()
        .filter(|score: f64, _: &String, _: &String| (score > 0.2).then_some(score))
        .build()
        .unwrap();

    let links = engine.links(items(), None).await.unwrap();
    assert_eq!(links, vec![link("item1", "item2", 0.25), link("item1", "item3", 2.0 / 3.0)]);

    let matrix = engine.matrix(items(), None).await.unwrap();
    assert_eq!(matrix.cell_count(), 4);
    assert_eq!(matrix.get("item2", "item3"), None);
    assert_eq!(matrix.get("item3", "item2"), None);
}

#[tokio::test]
async fn test_links_agree_with_matrix() {
    let engine = builder().build().unwrap();
    let links = engine.links(items(), None).await.unwrap();
    let matrix = engine.matrix(items(), None).await.unwrap();

    for link in &links {
        assert_eq!(matrix.get(&link.source, &link.target), Some(link.value));
        assert_eq!(matrix.get(&link.target, &link.source), Some(link.value));
    }
    assert_eq!(matrix.cell_count(), links.len() * 2);
}

#[derive(Debug, Clone)]
struct WrappedId {
    id: String,
}

#[tokio::test]
async fn test_structured_ids() {
    let logs: HashMap<&str, Vec<&str>> = HashMap::from([
        ("ITEM1", vec!["user1", "user2"]),
        ("ITEM2", vec!["user2", "user3", "user4"]),
        ("ITEM3", vec!["user1", "user2", "user5"]),
    ]);
    let sources: Vec<WrappedId> = ["ITEM1", "ITEM2", "ITEM3"]
        .iter()
        .map(|id| WrappedId { id: id.to_string() })
        .collect();

    let engine = JaccardBuilder::with_id_fn(|item: &WrappedId| item.id.to_lowercase())
        .loader_fn(move |item: &WrappedId| logs.get(item.id.as_str()).cloned())
        .build()
        .unwrap();

    let matrix = engine.matrix(sources, None).await.unwrap();
    assert_eq!(matrix, expected_matrix());
}

#[derive(Default)]
struct PseudoStream {
    buf: Vec<Link<String>>,
    ended: bool,
}

impl LinkSink<String> for PseudoStream {
    fn write(&mut self, link: Link<String>) -> Result<()> {
        assert!(!self.ended);
        self.buf.push(link);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.ended = true;
        Ok(())
    }
}

#[tokio::test]
async fn test_stream() {
    let engine = builder().direction(true).build().unwrap();
    let mut stream = PseudoStream::default();
    let written = engine.stream(items(), None, &mut stream).await.unwrap();
    assert!(stream.ended);
    assert_eq!(written, 6);
    assert_eq!(stream.buf.len(), 6);

    let engine = builder().build().unwrap();
    let mut stream = PseudoStream::default();
    engine.stream(items(), None, &mut stream).await.unwrap();
    assert!(stream.ended);
    assert_eq!(stream.buf.len(), 3);
}

#[tokio::test]
async fn test_stream_annotated_values() {
    let engine = builder()
        .direction(true)
        .annotate(|score: f64, source: &String, target: &String| {
            Some(serde_json::json!([source, target, score]))
        })
        .build()
        .unwrap();

    let mut stream: Vec<Link<String, serde_json::Value>> = Vec::new();
    engine.stream(items(), None, &mut stream).await.unwrap();
    assert_eq!(stream.len(), 6);
    assert_eq!(stream[0].value, serde_json::json!(["item1", "item2", 0.25]));
    assert_eq!(stream[5].value, serde_json::json!(["item3", "item2", 0.2]));
}

#[tokio::test]
async fn test_stream_into_channel() {
    let engine = builder().build().unwrap();
    let (mut tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Link<String>>();
    engine.stream(items(), None, &mut tx).await.unwrap();
    drop(tx);

    let mut received = Vec::new();
    while let Some(link) = rx.recv().await {
        received.push(link);
    }
    assert_eq!(received, engine.links(items(), None).await.unwrap());
}

#[tokio::test]
async fn test_add_log() {
    let store = LogStore::new();
    store.add_log("item1", "user1");
    store.add_log("item2", "user2");
    store.add_log("item3", "user1");
    store.add_log("item1", "user2");
    store.add_log("item2", "user3");
    store.add_log("item3", "user2");
    store.add_log("item2", "user4");
    store.add_log("item3", "user5");

    let engine = store.engine(JaccardConfig::default()).unwrap();
    let links = engine.links(Items::All, None).await.unwrap();
    assert_eq!(
        links,
        vec![
            link("item1", "item2", 0.25),
            link("item1", "item3", 2.0 / 3.0),
            link("item2", "item3", 0.2),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_scores_recomputed_after_expiry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = counting_builder(calls.clone()).expire(1000).build().unwrap();
    let item1 = "item1".to_string();
    let item2 = "item2".to_string();

    engine.cached_index(&item1, &item2).await.unwrap();
    engine.cached_index(&item2, &item1).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_millis(1001)).await;
    engine.cached_index(&item1, &item2).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_throttle_one_never_overlaps() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let logs = Arc::new(logs());

    let engine = {
        let active = active.clone();
        let peak = peak.clone();
        JaccardBuilder::<String>::new()
            .throttle(1)
            .async_loader(move |id: String| {
                let active = active.clone();
                let peak = peak.clone();
                let logs = logs.clone();
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(logs.get(&id).cloned())
                }
            })
            .build()
            .unwrap()
    };

    let handles: Vec<_> = items()
        .into_iter()
        .map(|item| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.cached_log(&item).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_some());
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_reported() {
    let engine = JaccardBuilder::<String>::new()
        .timeout(10)
        .async_loader(|_id: String| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(Some(vec!["user1"]))
        })
        .build()
        .unwrap();

    let err = engine.links(items(), None).await.unwrap_err();
    assert!(err.is_timeout());
    assert!(matches!(err, Error::Timeout(_)));
}

#[tokio::test]
async fn test_loader_failure_aborts_enumeration() {
    let engine = JaccardBuilder::<String>::new()
        .async_loader(|id: String| async move {
            if id == "item2" {
                return Err(Error::loader(anyhow::anyhow!("backend down")));
            }
            Ok(Some(vec!["user1"]))
        })
        .build()
        .unwrap();

    let err = engine.links(items(), None).await.unwrap_err();
    assert!(matches!(err, Error::Loader(_)));
    assert!(err.to_string().contains("backend down"));
}

#[tokio::test]
async fn test_files_to_csv() {
    let dir = TempDir::new().unwrap();
    let write = |name: &str, members: &str| {
        let path = dir.path().join(name);
        fs::write(&path, members).unwrap();
        path.to_string_lossy().into_owned()
    };
    let files = vec![
        write("foo.txt", "user1\nuser2\n"),
        write("bar.txt", "user2\nuser3\nuser4\n"),
        write("buz.txt", "user1\n\nuser2\nuser5\n"),
    ];

    let engine = JaccardBuilder::<String>::new()
        .expire(1000)
        .loader(FileLoader::new().loader())
        .filter(Round(3))
        .build()
        .unwrap();
    let links = engine.links(files, None).await.unwrap();

    assert_eq!(
        table_to_csv(&links_to_table(&links)),
        ",bar.txt,foo.txt,buz.txt\n\
         foo.txt,0.25,,0.667\n\
         bar.txt,,0.25,0.2\n\
         buz.txt,0.2,0.667\n"
    );
}

#[tokio::test]
async fn test_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let engine = JaccardBuilder::<String>::new()
        .loader(FileLoader::with_base(dir.path()).loader())
        .build()
        .unwrap();
    let err = engine
        .links(vec!["a.txt".to_string(), "b.txt".to_string()], None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Loader(_)));
}
