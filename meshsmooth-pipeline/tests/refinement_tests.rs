//! Integration tests for the refinement driver
//!
//! Most tests use a stub reconstructor that always returns an octahedron, so
//! runs are fast and only exercise file hand-off, naming, progress and
//! cancellation. One test runs the real Poisson reconstructor end to end.

use std::f32::consts::PI;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use approx::assert_relative_eq;
use meshsmooth_algorithms::KeepSet;
use meshsmooth_core::{Error, OrientedPointCloud, Point3f, Result, TriangleMesh};
use meshsmooth_io::{read_oriented_cloud, read_soup, write_stl, StlEncoding, StlStore};
use meshsmooth_pipeline::*;
use meshsmooth_reconstruction::{
    PoissonReconstructor, ReconstructionParams, StandardCleaner, SurfaceReconstructor,
};

fn octahedron() -> TriangleMesh {
    TriangleMesh::from_vertices_and_faces(
        vec![
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(-1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(0.0, -1.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(0.0, 0.0, -1.0),
        ],
        vec![
            [0, 2, 4], [2, 1, 4], [1, 3, 4], [3, 0, 4],
            [2, 0, 5], [1, 2, 5], [3, 1, 5], [0, 3, 5],
        ],
    )
}

/// Closed UV sphere with outward winding
fn uv_sphere(radius: f32, stacks: usize, slices: usize) -> TriangleMesh {
    let mut vertices = vec![Point3f::new(0.0, 0.0, radius)];
    for i in 1..stacks {
        let phi = PI * i as f32 / stacks as f32;
        for j in 0..slices {
            let theta = 2.0 * PI * j as f32 / slices as f32;
            vertices.push(Point3f::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
            ));
        }
    }
    vertices.push(Point3f::new(0.0, 0.0, -radius));
    let south = vertices.len() - 1;
    let ring = |i: usize, j: usize| 1 + (i - 1) * slices + (j % slices);

    let mut faces = Vec::new();
    for j in 0..slices {
        faces.push([0, ring(1, j), ring(1, j + 1)]);
    }
    for i in 1..stacks - 1 {
        for j in 0..slices {
            let (a, b, c, d) = (ring(i, j), ring(i + 1, j), ring(i + 1, j + 1), ring(i, j + 1));
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    for j in 0..slices {
        faces.push([ring(stacks - 1, j), south, ring(stacks - 1, j + 1)]);
    }

    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

/// Returns an octahedron, counts calls and records every cloud it is given
#[derive(Clone, Default)]
struct StubReconstructor {
    calls: Arc<AtomicUsize>,
    clouds: Arc<Mutex<Vec<Vec<Point3f>>>>,
    fail_on_call: Option<usize>,
}

impl StubReconstructor {
    fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SurfaceReconstructor for StubReconstructor {
    fn reconstruct(
        &self,
        cloud: &OrientedPointCloud,
        _params: &ReconstructionParams,
    ) -> Result<TriangleMesh> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.clouds
            .lock()
            .unwrap()
            .push(cloud.positions().copied().collect());
        if self.fail_on_call == Some(call) {
            return Err(Error::ReconstructionFailure("stub failure".to_string()));
        }
        Ok(octahedron())
    }
}

/// Blocks inside every call until the test releases it
struct GatedReconstructor {
    calls: Arc<AtomicUsize>,
    entered: flume::Sender<()>,
    release: flume::Receiver<()>,
}

impl SurfaceReconstructor for GatedReconstructor {
    fn reconstruct(
        &self,
        _cloud: &OrientedPointCloud,
        _params: &ReconstructionParams,
    ) -> Result<TriangleMesh> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.entered.send(());
        // Bounded so a broken test cannot hang the suite
        let _ = self.release.recv_timeout(Duration::from_secs(30));
        Ok(octahedron())
    }
}

fn write_input(dir: &Path, mesh: &TriangleMesh) -> std::path::PathBuf {
    let path = dir.join("input.stl");
    write_stl(mesh, &path, StlEncoding::Binary).unwrap();
    path
}

fn run_collecting<R>(
    driver: &RefinementDriver<StlStore, R, StandardCleaner>,
    token: &CancellationToken,
) -> (RefinementOutcome, Vec<ProgressEvent>)
where
    R: SurfaceReconstructor,
{
    let mut events = Vec::new();
    let outcome = driver.run(token, &mut |event: ProgressEvent| events.push(event));
    (outcome, events)
}

#[test]
fn test_single_iteration_writes_base_name() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &uv_sphere(1.0, 8, 12));
    let out_dir = dir.path().join("out");

    let config = RefinementConfig::new(&input, &out_dir).with_base_name("smooth");
    let stub = StubReconstructor::default();
    let driver = RefinementDriver::new(config, StlStore::default(), stub.clone(), StandardCleaner::default());

    let (outcome, events) = run_collecting(&driver, &CancellationToken::new());

    let expected = out_dir.join("smooth.stl");
    assert!(matches!(outcome, RefinementOutcome::Finished { ref path } if *path == expected));
    assert_eq!(
        events,
        vec![
            ProgressEvent::Percent(0),
            ProgressEvent::FileProduced(expected.clone()),
            ProgressEvent::Percent(100),
            ProgressEvent::Finished(expected.clone()),
        ]
    );
    assert_eq!(stub.calls(), 1);
    assert_eq!(read_soup(&expected).unwrap().len(), 8);
}

#[test]
fn test_cancel_after_first_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &uv_sphere(1.0, 8, 12));

    let config = RefinementConfig::new(&input, dir.path())
        .with_base_name("part")
        .with_iterations(3);
    let stub = StubReconstructor::default();
    let driver = RefinementDriver::new(config, StlStore::default(), stub.clone(), StandardCleaner::default());

    let token = CancellationToken::new();
    let mut events = Vec::new();
    let outcome = driver.run(&token, &mut |event: ProgressEvent| {
        if matches!(event, ProgressEvent::FileProduced(_)) {
            token.cancel();
        }
        events.push(event);
    });

    assert!(matches!(outcome, RefinementOutcome::Cancelled { completed: 1 }));
    assert_eq!(stub.calls(), 1);
    assert_eq!(events.last(), Some(&ProgressEvent::Aborted));
    assert!(events.contains(&ProgressEvent::Percent(33)));
    assert!(dir.path().join("part_1.stl").exists());
    assert!(!dir.path().join("part_2.stl").exists());
    assert!(!dir.path().join("part_3.stl").exists());
}

#[test]
fn test_iterations_chain_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &uv_sphere(1.0, 8, 12));

    let config = RefinementConfig::new(&input, dir.path())
        .with_base_name("pass")
        .with_iterations(2)
        .with_reduction(ReductionConfig::default().with_seed(5));
    let stub = StubReconstructor::default();
    let driver = RefinementDriver::new(config, StlStore::default(), stub.clone(), StandardCleaner::default());

    let (outcome, events) = run_collecting(&driver, &CancellationToken::new());
    assert!(outcome.is_finished());
    assert_eq!(stub.calls(), 2);

    // Second pass reads the octahedron written by the first: 4 neighbor vertices kept
    let clouds = stub.clouds.lock().unwrap();
    assert_eq!(clouds[1].len(), 4);

    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Percent(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![0, 50, 100]);
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::Finished(dir.path().join("pass_2.stl")))
    );
}

#[test]
fn test_depth_one_fails_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &octahedron());
    let out_dir = dir.path().join("never");

    let config = RefinementConfig::new(&input, &out_dir)
        .with_reduction(ReductionConfig::default().with_depth(1));
    let stub = StubReconstructor::default();
    let driver = RefinementDriver::new(config, StlStore::default(), stub.clone(), StandardCleaner::default());

    let (outcome, events) = run_collecting(&driver, &CancellationToken::new());

    assert!(matches!(
        outcome,
        RefinementOutcome::Failed { iteration: 0, error: Error::InvalidParameter(_) }
    ));
    assert_eq!(events, vec![ProgressEvent::Aborted]);
    assert_eq!(stub.calls(), 0);
    assert!(!out_dir.exists());
}

#[test]
fn test_failed_iteration_aborts_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &octahedron());

    let config = RefinementConfig::new(&input, dir.path())
        .with_base_name("f")
        .with_iterations(3);
    let stub = StubReconstructor::failing_on(2);
    let driver = RefinementDriver::new(config, StlStore::default(), stub.clone(), StandardCleaner::default());

    let (outcome, events) = run_collecting(&driver, &CancellationToken::new());

    assert!(matches!(
        outcome,
        RefinementOutcome::Failed { iteration: 2, error: Error::ReconstructionFailure(_) }
    ));
    assert_eq!(stub.calls(), 2);
    assert_eq!(events.last(), Some(&ProgressEvent::Aborted));
    assert!(dir.path().join("f_1.stl").exists());
    assert!(!dir.path().join("f_2.stl").exists());
}

#[test]
fn test_missing_input_is_io_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = RefinementConfig::new(dir.path().join("absent.stl"), dir.path());
    let driver = RefinementDriver::new(
        config,
        StlStore::default(),
        StubReconstructor::default(),
        StandardCleaner::default(),
    );

    let (outcome, _) = run_collecting(&driver, &CancellationToken::new());
    match outcome {
        RefinementOutcome::Failed { iteration, error } => {
            assert_eq!(iteration, 1);
            assert!(error.is_io());
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn test_spawned_driver_streams_events() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &uv_sphere(1.0, 6, 8));

    let config = RefinementConfig::new(&input, dir.path())
        .with_base_name("bg")
        .with_iterations(2);
    let handle = RefinementDriver::new(
        config,
        StlStore::new(StlEncoding::Ascii),
        StubReconstructor::default(),
        StandardCleaner::default(),
    )
    .spawn();

    let mut events = Vec::new();
    for event in handle.events().iter() {
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
    }

    let outcome = handle.join();
    assert!(outcome.is_finished());
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::Finished(dir.path().join("bg_2.stl")))
    );

    let mut last = 0;
    for event in &events {
        if let ProgressEvent::Percent(p) = event {
            assert!(*p >= last);
            last = *p;
        }
    }
    assert_eq!(last, 100);
}

#[test]
fn test_spawned_driver_cancelled_mid_pass() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &uv_sphere(1.0, 6, 8));

    let (entered_tx, entered_rx) = flume::unbounded();
    let (release_tx, release_rx) = flume::unbounded();
    let calls = Arc::new(AtomicUsize::new(0));
    let reconstructor = GatedReconstructor {
        calls: calls.clone(),
        entered: entered_tx,
        release: release_rx,
    };

    let config = RefinementConfig::new(&input, dir.path())
        .with_base_name("gated")
        .with_iterations(3);
    let handle = RefinementDriver::new(
        config,
        StlStore::default(),
        reconstructor,
        StandardCleaner::default(),
    )
    .spawn();

    // Cancel from this thread while pass 1 is inside reconstruction
    entered_rx.recv_timeout(Duration::from_secs(30)).unwrap();
    assert!(!handle.token().is_cancelled());
    handle.cancel();
    assert!(handle.token().is_cancelled());
    release_tx.send(()).unwrap();

    let events: Vec<ProgressEvent> = handle.events().iter().take_while(|e| !e.is_terminal()).collect();
    let outcome = handle.join();

    assert!(matches!(outcome, RefinementOutcome::Cancelled { completed: 1 }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(events.contains(&ProgressEvent::FileProduced(dir.path().join("gated_1.stl"))));
    assert!(dir.path().join("gated_1.stl").exists());
    assert!(!dir.path().join("gated_2.stl").exists());
}

#[test]
fn test_cloud_dump_kept_for_every_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &uv_sphere(1.0, 8, 12));
    let dump = dir.path().join("cloud.ply");

    let config = RefinementConfig::new(&input, dir.path())
        .with_base_name("dumped")
        .with_iterations(2)
        .with_reduction(ReductionConfig::default().with_seed(3).with_cloud_dump(&dump));
    let stub = StubReconstructor::default();
    let driver = RefinementDriver::new(config, StlStore::default(), stub.clone(), StandardCleaner::default());

    let (outcome, _) = run_collecting(&driver, &CancellationToken::new());
    assert!(outcome.is_finished());

    let clouds = stub.clouds.lock().unwrap();
    let first = read_oriented_cloud(&dir.path().join("cloud_1.ply")).unwrap();
    let second = read_oriented_cloud(&dir.path().join("cloud_2.ply")).unwrap();
    assert_eq!(first.len(), clouds[0].len());
    assert_eq!(second.len(), clouds[1].len());
    assert_ne!(first.len(), second.len());
    assert!(!dump.exists());
}

#[test]
fn test_same_seed_same_reduced_cloud() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &uv_sphere(1.0, 12, 16));

    let mut clouds = Vec::new();
    for run in 0..2 {
        let config = RefinementConfig::new(&input, dir.path().join(format!("run{}", run)))
            .with_reduction(ReductionConfig::default().with_seed(42).with_keep(KeepSet::Seed));
        let stub = StubReconstructor::default();
        let driver = RefinementDriver::new(config, StlStore::default(), stub.clone(), StandardCleaner::default());
        assert!(driver.run(&CancellationToken::new(), &mut |_: ProgressEvent| {}).is_finished());

        let recorded = stub.clouds.lock().unwrap();
        clouds.push(recorded[0].clone());
    }

    assert!(!clouds[0].is_empty());
    assert_eq!(clouds[0], clouds[1]);
}

#[test]
fn test_reduce_file_with_cloud_dump() {
    let dir = tempfile::tempdir().unwrap();
    let sphere = uv_sphere(2.0, 10, 14);
    let input = write_input(dir.path(), &sphere);
    let output = dir.path().join("reduced.stl");
    let dump = dir.path().join("cloud.ply");

    let config = ReductionConfig::default().with_seed(9).with_cloud_dump(&dump);
    let reducer = Reducer::new(config, StubReconstructor::default(), StandardCleaner::default());
    let stats = reducer.reduce_file(&StlStore::default(), &input, &output).unwrap();

    assert_eq!(stats.input_vertices, sphere.vertex_count());
    assert_eq!(stats.input_faces, sphere.face_count());
    assert_eq!(stats.collapsed_faces, 0);
    assert_eq!(stats.degenerate_vertices, 0);
    assert_eq!(stats.seed_vertices + stats.neighbor_vertices, sphere.vertex_count());
    assert_eq!(stats.kept_points, stats.neighbor_vertices);
    assert_eq!(stats.output_faces, 8);

    let cloud = read_oriented_cloud(&dump).unwrap();
    assert_eq!(cloud.len(), stats.kept_points);
    for p in cloud.iter() {
        assert_relative_eq!(p.normal.norm(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.position.coords.norm(), 2.0, epsilon = 1e-5);
        assert!(p.normal.dot(&p.position.coords) > 0.0);
    }
}

#[test]
fn test_poisson_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &uv_sphere(1.0, 24, 32));

    let config = RefinementConfig::new(&input, dir.path())
        .with_base_name("poisson")
        .with_reduction(ReductionConfig::default().with_seed(1).with_depth(5));
    let driver = RefinementDriver::new(
        config,
        StlStore::default(),
        PoissonReconstructor::new(),
        StandardCleaner::default(),
    );

    let (outcome, _) = run_collecting(&driver, &CancellationToken::new());
    let path = match outcome {
        RefinementOutcome::Finished { path } => path,
        other => panic!("reconstruction did not finish: {:?}", other),
    };

    let soup = read_soup(&path).unwrap();
    assert!(!soup.is_empty());
}
