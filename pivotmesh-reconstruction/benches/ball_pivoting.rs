//! Benchmarks for ball pivoting reconstruction on sampled spheres

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pivotmesh_core::{Point3d, Vector3d};
use pivotmesh_reconstruction::{BallPivoting, BallPivotingConfig};

/// Fibonacci sampling of the unit sphere with outward normals
fn generate_sphere(num_points: usize) -> (Vec<Point3d>, Vec<Vector3d>) {
    let golden_angle = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    let mut points = Vec::with_capacity(num_points);
    let mut normals = Vec::with_capacity(num_points);
    for i in 0..num_points {
        let z = 1.0 - 2.0 * (i as f64 + 0.5) / num_points as f64;
        let ring = (1.0 - z * z).sqrt();
        let theta = golden_angle * i as f64;
        let normal = Vector3d::new(ring * theta.cos(), ring * theta.sin(), z);
        points.push(Point3d::from(normal));
        normals.push(normal);
    }
    (points, normals)
}

fn bench_reconstruction(c: &mut Criterion) {
    let sizes = [500, 2000, 8000];

    let mut group = c.benchmark_group("ball_pivoting");
    group.sample_size(10);

    for &size in &sizes {
        let (points, normals) = generate_sphere(size);
        // Mean spacing of a Fibonacci sphere is about sqrt(4π / n)
        let spacing = (4.0 * std::f64::consts::PI / size as f64).sqrt();
        let config = BallPivotingConfig::new(vec![spacing, 2.0 * spacing]);

        group.bench_with_input(
            BenchmarkId::new("sphere", size),
            &(&points, &normals, &config),
            |b, &(points, normals, config)| {
                b.iter(|| {
                    let mut bpa = BallPivoting::new(points, normals, config.clone()).unwrap();
                    let result = bpa.reconstruct().unwrap();
                    black_box(result);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_reconstruction);
criterion_main!(benches);
