use criterion::{criterion_group, criterion_main, Criterion};
use lineage_registration::registration::{estimate_transform, register_lineages};
use lineage_registration::synthetic::{flip_randomly, generate_embryo, transformed_copy, EmbryoParams};
use lineage_registration::{RegistrationConfig, SimilarityTransform};
use nalgebra::{Rotation3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn bench_registration(c: &mut Criterion) {
    let config = RegistrationConfig::default();
    let mut rng = StdRng::seed_from_u64(7);
    let moved = SimilarityTransform::new(
        Rotation3::from_euler_angles(0.3, -1.1, 2.0),
        1.4,
        Vector3::new(12.0, -3.0, 8.0),
    );

    let pairs: Vec<_> = (0..50)
        .map(|_| {
            let p = Vector3::new(
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
            );
            (p, moved.apply(&p))
        })
        .collect();
    c.bench_function("estimate_transform_50_anchors", |b| {
        b.iter(|| estimate_transform(&pairs, &config))
    });

    for generations in [4, 7] {
        let params = EmbryoParams {
            founders: 8,
            generations,
            ..Default::default()
        };
        let a = generate_embryo(&mut rng, &params).expect("synthetic embryo");
        let mut copy = transformed_copy(&a, &moved).expect("moved copy");
        flip_randomly(&mut copy, &mut rng).expect("shuffled copy");

        c.bench_function(
            &format!("register_8_founders_{}_generations", generations),
            |b| b.iter(|| register_lineages(&a, &copy, &config)),
        );
    }
}

criterion_group!(benches, bench_registration);
criterion_main!(benches);
