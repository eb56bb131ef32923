//! Integration tests for the change engine

use anyhow::Result;
use async_trait::async_trait;
use mapedit_changes::{
    ActionError, ChangeAction, ChangeDescription, ChangeType, ChangesConfig, CreateNewNodeAction, CreateNodeOptions,
    GeometryChange, IdRewrites, ObjectGraph, OsmId, OsmObjectType, OsmWay, PendingChangeSet, PointRegistry, UploadError,
    Uploader,
};
use mapedit_geometry::{Coordinate, Geometry, GeometryError, NearestPoint, PlanarGeometry, EARTH_RADIUS_METERS};
use mapedit_tags::{parse, Tag, TagsFilter};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn bench() -> Vec<Tag> {
    vec![Tag::new("amenity", "bench")]
}

/// Meters along the equator expressed in degrees of longitude
fn meters_to_degrees(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_METERS).to_degrees()
}

/// Planar geometry that takes its time projecting
#[derive(Debug)]
struct SlowGeometry(Duration);

impl Geometry for SlowGeometry {
    fn nearest_point_on_line(&self, line: &[Coordinate], point: Coordinate) -> Result<NearestPoint, GeometryError> {
        std::thread::sleep(self.0);
        PlanarGeometry.nearest_point_on_line(line, point)
    }

    fn distance(&self, a: Coordinate, b: Coordinate) -> f64 {
        PlanarGeometry.distance(a, b)
    }
}

/// Hands out server ids counting up from 1000 for every placeholder it sees
#[derive(Default)]
struct RecordingUploader {
    batches: Mutex<Vec<Vec<ChangeDescription>>>,
    next_id: AtomicI64,
}

#[async_trait]
impl Uploader for RecordingUploader {
    async fn upload(&self, changes: &[ChangeDescription]) -> Result<IdRewrites, UploadError> {
        let mut rewrites = IdRewrites::new();
        for change in changes {
            let target = change.target();
            if target.is_placeholder() && rewrites.get(&target).is_none() {
                let id = 1000 + self.next_id.fetch_add(1, Ordering::SeqCst);
                rewrites
                    .insert(target, OsmId::new(target.object_type, id))
                    .map_err(|err| UploadError::Rejected(err.to_string()))?;
            }
        }

        self.batches.lock().await.push(changes.to_vec());
        Ok(rewrites)
    }
}

#[tokio::test]
async fn test_untagged_point_is_created_once() -> Result<()> {
    init_tracing();
    let changes = PendingChangeSet::isolated();

    let mut first = CreateNewNodeAction::new(vec![], Some(51.05), Some(3.72), CreateNodeOptions::new())?;
    let mut second = CreateNewNodeAction::new(vec![], Some(51.05), Some(3.72), CreateNodeOptions::new())?;

    assert_eq!(changes.apply_action(&mut first).await?.len(), 1);
    assert!(changes.apply_action(&mut second).await?.is_empty());

    assert_eq!(first.new_element_id(), second.new_element_id());
    assert_eq!(first.new_element_id().as_deref(), Some("node/-1"));
    assert_eq!(changes.len().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_point_registry_is_shared_between_sessions() -> Result<()> {
    let registry = Arc::new(PointRegistry::new());
    let morning = PendingChangeSet::new(Arc::clone(&registry));
    let afternoon = PendingChangeSet::new(Arc::clone(&registry));

    let mut first = CreateNewNodeAction::new(vec![], Some(1.0), Some(2.0), CreateNodeOptions::new())?;
    morning.apply_action(&mut first).await?;

    let mut again = CreateNewNodeAction::new(vec![], Some(1.0), Some(2.0), CreateNodeOptions::new())?;
    assert!(afternoon.apply_action(&mut again).await?.is_empty());
    assert_eq!(again.new_element_id_number(), first.new_element_id_number());

    // a fresh registry knows nothing about it
    let elsewhere = PendingChangeSet::isolated();
    let mut other = CreateNewNodeAction::new(vec![], Some(1.0), Some(2.0), CreateNodeOptions::new())?;
    assert_eq!(elsewhere.apply_action(&mut other).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_tagged_points_never_dedup() -> Result<()> {
    let changes = PendingChangeSet::isolated();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let mut action = CreateNewNodeAction::new(bench(), Some(51.05), Some(3.72), CreateNodeOptions::new())?;
        let descriptions = changes.apply_action(&mut action).await?;
        assert_eq!(descriptions.len(), 1);
        ids.push(action.new_element_id_number().unwrap_or_default());
    }

    assert_eq!(ids, vec![-1, -2, -3]);
    assert!(changes.registry().is_empty().await);
    Ok(())
}

#[tokio::test]
async fn test_explicit_reuse_of_tagged_point() -> Result<()> {
    let changes = PendingChangeSet::isolated();
    let options = CreateNodeOptions::new().allow_reuse(true);

    let mut first = CreateNewNodeAction::new(bench(), Some(5.0), Some(5.0), options.clone())?;
    let mut second = CreateNewNodeAction::new(bench(), Some(5.0), Some(5.0), options)?;
    changes.apply_action(&mut first).await?;

    assert!(changes.apply_action(&mut second).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_snap_reuses_vertex_within_threshold() -> Result<()> {
    let changes = PendingChangeSet::isolated();
    let way = OsmWay::new(9, vec![1, 2], vec![[0.0, 0.0], [0.0, 10.0]]);

    let mut action = CreateNewNodeAction::new(bench(), Some(0.0), Some(0.5), CreateNodeOptions::new().snap_onto(way))?
        .with_geometry(Arc::new(PlanarGeometry));
    let descriptions = changes.apply_action(&mut action).await?;

    assert_eq!(descriptions.len(), 1);
    let retag = &descriptions[0];
    assert_eq!(retag.target(), OsmId::node(1));
    assert!(retag.changes.is_none());
    assert_eq!(retag.meta.change_type, ChangeType::Create);
    assert_eq!(
        retag.tags.as_ref().and_then(|tags| tags.get("amenity").cloned()),
        Some(Some("bench".to_string()))
    );
    assert_eq!(action.new_element_id().as_deref(), Some("node/1"));
    Ok(())
}

#[tokio::test]
async fn test_snap_inserts_node_beyond_threshold() -> Result<()> {
    let changes = PendingChangeSet::isolated();
    let way = OsmWay::new(9, vec![1, 2], vec![[0.0, 0.0], [0.0, 10.0]]);

    let mut action = CreateNewNodeAction::new(bench(), Some(0.0), Some(1.5), CreateNodeOptions::new().snap_onto(way))?
        .with_geometry(Arc::new(PlanarGeometry));
    let descriptions = changes.apply_action(&mut action).await?;

    assert_eq!(descriptions.len(), 2);
    assert_eq!(descriptions[0].target(), OsmId::node(-1));
    assert_eq!(descriptions[1].target(), OsmId::way(9));
    assert_eq!(descriptions[1].references(), vec![OsmId::node(1), OsmId::node(-1), OsmId::node(2)]);
    Ok(())
}

#[tokio::test]
async fn test_snap_threshold_in_meters_on_the_sphere() -> Result<()> {
    let way = OsmWay::new(9, vec![1, 2], vec![[0.0, 0.0], [0.0, 0.01]]);

    let close = PendingChangeSet::isolated();
    let mut action = CreateNewNodeAction::new(
        bench(),
        Some(0.0),
        Some(meters_to_degrees(0.5)),
        CreateNodeOptions::new().snap_onto(way.clone()),
    )?;
    assert_eq!(close.apply_action(&mut action).await?.len(), 1);
    assert_eq!(action.new_element_id_number(), Some(1));

    let far = PendingChangeSet::isolated();
    let mut action = CreateNewNodeAction::new(
        bench(),
        Some(0.0),
        Some(meters_to_degrees(1.5)),
        CreateNodeOptions::new().snap_onto(way),
    )?;
    assert_eq!(far.apply_action(&mut action).await?.len(), 2);
    assert_eq!(action.new_element_id_number(), Some(-1));
    Ok(())
}

#[tokio::test]
async fn test_splice_keeps_order_and_creates_first() -> Result<()> {
    let changes = PendingChangeSet::isolated();
    let way = OsmWay::new(9, vec![1, 2, 3], vec![[0.0, 0.0], [0.0, 1.0], [0.0, 2.0]]);

    let mut action = CreateNewNodeAction::new(
        bench(),
        Some(0.0),
        Some(0.5),
        CreateNodeOptions::new().snap_onto(way).theme("benches"),
    )?;
    let descriptions = changes.apply_action(&mut action).await?;
    let new_id = action.new_element_id_number().unwrap_or_default();

    assert_eq!(descriptions.len(), 2);
    assert_eq!(descriptions[0].object_type, OsmObjectType::Node);
    assert_eq!(descriptions[0].changes, Some(GeometryChange::Node { lat: 0.0, lon: 0.5 }));
    assert_eq!(
        descriptions[1].changes,
        Some(GeometryChange::Way {
            nodes: vec![1, new_id, 2, 3],
            coordinates: vec![[0.0, 0.0], [0.5, 0.0], [1.0, 0.0], [2.0, 0.0]],
        })
    );
    assert_eq!(changes.pending().await, descriptions);
    Ok(())
}

#[tokio::test]
async fn test_failed_actions_leave_log_untouched() -> Result<()> {
    let changes = PendingChangeSet::isolated();

    assert!(matches!(
        CreateNewNodeAction::new(bench(), Some(1.0), None, CreateNodeOptions::new()),
        Err(ActionError::InvalidCoordinate { lat: Some(_), lon: None })
    ));

    let mut regex_tag = CreateNewNodeAction::new(
        vec![Tag::new("amenity", "bench"), Tag::regex("colour", "^(red|blue)$")?],
        Some(1.0),
        Some(1.0),
        CreateNodeOptions::new(),
    )?;
    assert!(matches!(
        changes.apply_action(&mut regex_tag).await,
        Err(ActionError::InvalidTagValue { .. })
    ));

    let degenerate = OsmWay::new(9, vec![1], vec![[0.0, 0.0]]);
    let mut snap = CreateNewNodeAction::new(vec![], Some(1.0), Some(1.0), CreateNodeOptions::new().snap_onto(degenerate))?;
    assert!(matches!(changes.apply_action(&mut snap).await, Err(ActionError::Geometry(_))));

    assert!(changes.is_empty().await);
    assert!(changes.registry().is_empty().await);

    // the position is free again for a later attempt
    let mut retry = CreateNewNodeAction::new(vec![], Some(1.0), Some(1.0), CreateNodeOptions::new())?;
    assert_eq!(changes.apply_action(&mut retry).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_flush_registers_server_ids() -> Result<()> {
    init_tracing();
    let changes = PendingChangeSet::isolated();
    let uploader = RecordingUploader::default();

    let mut point = CreateNewNodeAction::new(vec![], Some(51.0), Some(3.0), CreateNodeOptions::new())?;
    changes.apply_action(&mut point).await?;

    let rewrites = changes.flush(&uploader).await?;
    assert_eq!(rewrites.get(&OsmId::node(-1)), Some(OsmId::node(1000)));
    assert!(changes.is_empty().await);
    assert_eq!(uploader.batches.lock().await.len(), 1);

    // the same point is now known under its server id
    let mut again = CreateNewNodeAction::new(vec![], Some(51.0), Some(3.0), CreateNodeOptions::new())?;
    assert!(changes.apply_action(&mut again).await?.is_empty());
    assert_eq!(again.new_element_id().as_deref(), Some("node/1000"));

    // nothing pending, nothing uploaded
    assert!(changes.flush(&uploader).await?.is_empty());
    assert_eq!(uploader.batches.lock().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_rewrites_apply_to_changes_still_pending() -> Result<()> {
    let changes = PendingChangeSet::isolated();
    let way = OsmWay::new(9, vec![1, 2], vec![[0.0, 0.0], [0.0, 1.0]]);

    let mut action = CreateNewNodeAction::new(bench(), Some(0.0), Some(0.5), CreateNodeOptions::new().snap_onto(way))?;
    changes.apply_action(&mut action).await?;

    changes
        .register_id_rewrites(&IdRewrites::from_strings([("node/-1", "node/77")])?)
        .await;

    let pending = changes.pending().await;
    assert_eq!(pending[0].target(), OsmId::node(77));
    assert_eq!(pending[1].references(), vec![OsmId::node(1), OsmId::node(77), OsmId::node(2)]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_see_old_or_new_id_only() -> Result<()> {
    let changes = Arc::new(PendingChangeSet::isolated());
    let key = PointRegistry::key(Coordinate::new(10.0, 20.0));
    let mut action = CreateNewNodeAction::new(vec![], Some(10.0), Some(20.0), CreateNodeOptions::new())?;
    changes.apply_action(&mut action).await?;

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let changes = Arc::clone(&changes);
            let key = key.clone();
            tokio::spawn(async move {
                let mut seen_new = false;
                for _ in 0..200 {
                    let id = changes.registry().get(&key).await;
                    match id {
                        Some(-1) => assert!(!seen_new, "went back to the placeholder"),
                        Some(500) => seen_new = true,
                        other => panic!("unexpected registry value {:?}", other),
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    changes
        .register_id_rewrites(&IdRewrites::from_strings([("node/-1", "node/500")])?)
        .await;

    for reader in readers {
        reader.await?;
    }
    assert_eq!(changes.registry().get(&key).await, Some(500));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_at_same_position() -> Result<()> {
    let changes = Arc::new(PendingChangeSet::isolated());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let changes = Arc::clone(&changes);
            tokio::spawn(async move {
                let mut action = CreateNewNodeAction::new(vec![], Some(4.0), Some(4.0), CreateNodeOptions::new())?;
                changes.apply_action(&mut action).await?;
                Ok::<_, ActionError>(action.new_element_id_number())
            })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await??);
    }

    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(changes.len().await, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_creation_during_slow_snap_adopts_reused_vertex() -> Result<()> {
    init_tracing();
    let changes = Arc::new(PendingChangeSet::isolated());
    let way = OsmWay::new(9, vec![1, 2], vec![[0.0, 0.0], [0.0, 10.0]]);

    let snapping = {
        let changes = Arc::clone(&changes);
        tokio::spawn(async move {
            let mut action =
                CreateNewNodeAction::new(vec![], Some(0.0), Some(0.5), CreateNodeOptions::new().snap_onto(way))?
                    .with_geometry(Arc::new(SlowGeometry(Duration::from_millis(300))));
            let descriptions = changes.apply_action(&mut action).await?;
            Ok::<_, ActionError>((action.new_element_id_number(), descriptions))
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut plain = CreateNewNodeAction::new(vec![], Some(0.0), Some(0.5), CreateNodeOptions::new())?;
    let plain_descriptions = changes.apply_action(&mut plain).await?;

    let (snapped_id, snapped_descriptions) = snapping.await??;

    assert_eq!(snapped_id, Some(1));
    assert_eq!(plain.new_element_id_number(), Some(1));
    assert!(plain_descriptions.is_empty());
    assert_eq!(snapped_descriptions.len(), 1);

    let pending = changes.pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].target(), OsmId::node(1));
    assert_eq!(changes.registry().get(&PointRegistry::key(Coordinate::new(0.0, 0.5))).await, Some(1));
    Ok(())
}

#[tokio::test]
async fn test_negative_zero_dedups_with_zero() -> Result<()> {
    let changes = PendingChangeSet::isolated();

    let mut first = CreateNewNodeAction::new(vec![], Some(-0.0), Some(3.0), CreateNodeOptions::new())?;
    let mut second = CreateNewNodeAction::new(vec![], Some(0.0), Some(3.0), CreateNodeOptions::new())?;

    assert_eq!(changes.apply_action(&mut first).await?.len(), 1);
    assert!(changes.apply_action(&mut second).await?.is_empty());
    assert_eq!(second.new_element_id_number(), first.new_element_id_number());
    Ok(())
}

#[tokio::test]
async fn test_config_drives_defaults() -> Result<()> {
    let config = ChangesConfig::from_json_str(
        r#"{ "firstPlaceholderId": -100, "reusePointWithinMeters": 0.25, "theme": "trees" }"#,
    )?;
    let changes = PendingChangeSet::with_config(config, Arc::new(PointRegistry::new()));
    let way = OsmWay::new(9, vec![1, 2], vec![[0.0, 0.0], [0.0, 10.0]]);

    let mut action = CreateNewNodeAction::new(bench(), Some(0.0), Some(0.5), CreateNodeOptions::new().snap_onto(way))?
        .with_geometry(Arc::new(PlanarGeometry));
    let descriptions = changes.apply_action(&mut action).await?;

    // 0.5 is beyond the configured 0.25, so the node is spliced in
    assert_eq!(descriptions.len(), 2);
    assert_eq!(descriptions[0].id, -100);
    assert_eq!(descriptions[0].meta.theme, "trees");
    Ok(())
}

#[tokio::test]
async fn test_import_change_type_is_kept() -> Result<()> {
    let changes = PendingChangeSet::isolated();
    let mut action = CreateNewNodeAction::new(
        bench(),
        Some(1.0),
        Some(1.0),
        CreateNodeOptions::new().change_type(ChangeType::Import),
    )?;

    let descriptions = changes.apply_action(&mut action).await?;
    assert_eq!(descriptions[0].meta.change_type, ChangeType::Import);

    let way = OsmWay::new(9, vec![1, 2], vec![[0.0, 0.0], [0.0, 10.0]]);
    let mut onto_vertex = CreateNewNodeAction::new(
        bench(),
        Some(0.0),
        Some(0.5),
        CreateNodeOptions::new().snap_onto(way).change_type(ChangeType::Import),
    )?
    .with_geometry(Arc::new(PlanarGeometry));

    let descriptions = changes.apply_action(&mut onto_vertex).await?;
    assert_eq!(descriptions.len(), 1);
    assert_eq!(descriptions[0].target(), OsmId::node(1));
    assert_eq!(descriptions[0].meta.change_type, ChangeType::Import);
    Ok(())
}

#[test]
fn test_expression_round_trip() -> Result<()> {
    let sources = [
        "amenity=bench",
        "amenity=bench & backrest=yes",
        "shop=bakery & (opening_hours=24/7 | opening_hours=)",
        "\"name~De .*\" | name!~.*Bakkerij.*",
        "\"ref:={id} copy\"",
    ];

    for source in sources {
        let filter = parse(source)?;
        let reparsed = parse(&filter.to_string())?;
        assert_eq!(reparsed, filter, "round trip of {}", source);

        let json = serde_json::to_string(&filter.to_json())?;
        assert_eq!(TagsFilter::from_json_str(&json)?, filter);
    }
    Ok(())
}

#[test]
fn test_materialized_answer_matches_its_filter() -> Result<()> {
    let answers = [
        "amenity=bench & backrest=yes",
        "amenity=bench & backrest=",
        "ref:=B{id}",
    ];

    for answer in answers {
        let filter = parse(answer)?;
        let mut bag: BTreeMap<String, String> = BTreeMap::new();
        bag.insert("id".to_string(), "node/-1".to_string());
        bag.insert("backrest".to_string(), "no".to_string());

        for (key, value) in filter.as_change(&bag)? {
            bag.insert(key, value);
        }
        assert!(filter.matches(&bag), "{} does not hold after applying it", answer);
    }
    Ok(())
}

#[tokio::test]
async fn test_object_graph_follows_the_session() -> Result<()> {
    let changes = PendingChangeSet::isolated();
    let uploader = RecordingUploader::default();

    let mut graph = ObjectGraph::new();
    let way = OsmWay::new(9, vec![1, 2], vec![[0.0, 0.0], [0.0, 1.0]]);
    graph.insert_way(way.clone());

    let mut action = CreateNewNodeAction::new(bench(), Some(0.0), Some(0.5), CreateNodeOptions::new().snap_onto(way))?;
    let descriptions = changes.apply_action(&mut action).await?;
    graph.apply_all(&descriptions)?;

    assert_eq!(graph.matching(&parse("amenity=bench")?), vec![OsmId::node(-1)]);
    assert_eq!(graph.way(9).map(|way| way.nodes.clone()), Some(vec![1, -1, 2]));

    let rewrites = changes.flush(&uploader).await?;
    graph.rewrite_ids(&rewrites);

    assert_eq!(graph.matching(&parse("amenity=bench")?), vec![OsmId::node(1000)]);
    assert_eq!(graph.way(9).map(|way| way.nodes.clone()), Some(vec![1, 1000, 2]));
    Ok(())
}

struct NoopAction;

#[async_trait]
impl ChangeAction for NoopAction {
    async fn create_change_descriptions(
        &mut self,
        _changes: &PendingChangeSet,
    ) -> Result<Vec<ChangeDescription>, ActionError> {
        Ok(vec![])
    }
}

#[tokio::test]
async fn test_actions_are_object_safe() -> Result<()> {
    let changes = PendingChangeSet::isolated();
    let mut actions: Vec<Box<dyn ChangeAction>> = vec![
        Box::new(NoopAction),
        Box::new(CreateNewNodeAction::new(vec![], Some(2.0), Some(2.0), CreateNodeOptions::new())?),
    ];

    let mut produced = 0;
    for action in actions.iter_mut() {
        produced += changes.apply_action(action.as_mut()).await?.len();
    }
    assert_eq!(produced, 1);
    Ok(())
}
