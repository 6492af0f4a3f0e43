mod support;

use approx::assert_relative_eq;
use meshwind::{
    BooleanConfig, BooleanError, BooleanType, ExactMesh, KeepRule, TriMesh, WindingNumberOp, combine,
    mesh_boolean, mesh_boolean_custom, mesh_boolean_exact, mesh_boolean_n, mesh_boolean_str,
};
use nalgebra::Point3;
use num_traits::Zero;

use crate::support::{
    approx_eq, cube, cuboid, is_closed_and_oriented, is_compact, is_edge_balanced, ratio, sorted_vertices,
};

fn exact_pair(offset: [f64; 3], op: BooleanType) -> meshwind::ExactBooleanOutput {
    let a = cube([0.0, 0.0, 0.0]).to_exact().unwrap();
    let b = cube(offset).to_exact().unwrap();
    mesh_boolean_exact(&[a, b], op, &BooleanConfig::sequential()).unwrap()
}

#[test]
fn disjoint_union_keeps_both_cubes() {
    let a = cube([0.0, 0.0, 0.0]);
    let b = cube([3.0, 0.0, 0.0]);
    let out = mesh_boolean(&a, &b, BooleanType::Union, &BooleanConfig::default()).unwrap();
    assert!(out.valid);
    assert_eq!(out.mesh.face_count(), 24);
    assert_eq!(out.mesh.vertex_count(), 16);
    assert_eq!(out.birth, (0..24).collect::<Vec<_>>());
    assert_relative_eq!(out.mesh.signed_volume(), 2.0, epsilon = 1e-12);
    assert!(is_closed_and_oriented(&out.mesh));
}

#[test]
fn disjoint_intersection_is_empty() {
    let out = mesh_boolean(
        &cube([0.0, 0.0, 0.0]),
        &cube([3.0, 0.0, 0.0]),
        BooleanType::Intersect,
        &BooleanConfig::default(),
    )
    .unwrap();
    assert!(out.valid);
    assert!(out.mesh.is_empty());
    assert_eq!(out.mesh.vertex_count(), 0);
    assert!(out.birth.is_empty());
}

#[test]
fn disjoint_difference_is_the_first_cube() {
    let out = mesh_boolean(
        &cube([0.0, 0.0, 0.0]),
        &cube([3.0, 0.0, 0.0]),
        BooleanType::Minus,
        &BooleanConfig::default(),
    )
    .unwrap();
    assert!(out.valid);
    assert_eq!(out.mesh.face_count(), 12);
    assert!(out.birth.iter().all(|&b| b < 12));
    assert_relative_eq!(out.mesh.signed_volume(), 1.0, epsilon = 1e-12);
}

#[test]
fn corner_overlap_volumes_are_exact() {
    let offset = [0.5, 0.5, 0.5];
    // six times the volume
    let expected = [
        (BooleanType::Union, ratio(45, 4)),
        (BooleanType::Intersect, ratio(3, 4)),
        (BooleanType::Minus, ratio(21, 4)),
        (BooleanType::Xor, ratio(21, 2)),
    ];
    for (op, volume) in expected {
        let out = exact_pair(offset, op);
        assert!(out.valid, "{op} should be valid");
        assert_eq!(out.mesh.signed_volume_x6(), volume, "{op}");
        assert!(is_compact(&out.mesh), "{op} should have no repeated faces or loose vertices");
        if op == BooleanType::Xor {
            // both pieces meet along the intersection curve, four faces per edge
            assert!(is_edge_balanced(&out.mesh), "xor should be balanced");
        } else {
            assert!(is_closed_and_oriented(&out.mesh), "{op} should be closed");
        }
        assert!(out.stats.intersecting_pairs > 0);
    }
}

#[test]
fn face_sharing_overlap_handles_coplanar_faces() {
    // the cubes share their y and z bounding planes
    let offset = [0.5, 0.0, 0.0];
    let expected = [
        (BooleanType::Union, ratio(9, 1)),
        (BooleanType::Intersect, ratio(3, 1)),
        (BooleanType::Minus, ratio(3, 1)),
        (BooleanType::Xor, ratio(6, 1)),
    ];
    for (op, volume) in expected {
        let out = exact_pair(offset, op);
        assert!(out.valid, "{op} should be valid");
        assert_eq!(out.mesh.signed_volume_x6(), volume, "{op}");
        assert!(is_closed_and_oriented(&out.mesh), "{op} should be closed");
        assert!(is_compact(&out.mesh), "{op} should have no repeated faces or loose vertices");
    }
}

#[test]
fn a_cube_combined_with_itself() {
    let same = [0.0, 0.0, 0.0];
    for op in [BooleanType::Union, BooleanType::Intersect] {
        let out = exact_pair(same, op);
        assert!(out.valid);
        assert_eq!(out.mesh.faces.len(), 12, "{op}");
        assert_eq!(out.mesh.signed_volume_x6(), ratio(6, 1));
    }
    for op in [BooleanType::Minus, BooleanType::Xor] {
        let out = exact_pair(same, op);
        assert!(out.valid);
        assert!(out.mesh.faces.is_empty(), "{op}");
    }
}

#[test]
fn resolving_a_doubled_solid_is_an_error() {
    let cube = cube([0.0, 0.0, 0.0]).to_exact().unwrap();
    let result = mesh_boolean_exact(&[cube.clone(), cube], BooleanType::Resolve, &BooleanConfig::sequential());
    match result {
        Err(BooleanError::InconsistentDuplicateFaces { positive, negative, .. }) => {
            assert_eq!(positive.abs_diff(negative), 2);
        },
        other => panic!("expected a duplicate-face error, got {other:?}"),
    }
}

#[test]
fn repeated_runs_give_the_same_mesh() {
    let offset = [0.5, 0.25, 0.0];
    let first = exact_pair(offset, BooleanType::Intersect);
    assert!(first.valid);
    for _ in 0..10 {
        let again = exact_pair(offset, BooleanType::Intersect);
        assert_eq!(again.mesh, first.mesh);
        assert_eq!(again.birth, first.birth);
    }
    // the thread pool does not change the answer either
    let a = cube([0.0, 0.0, 0.0]).to_exact().unwrap();
    let b = cube(offset).to_exact().unwrap();
    let pooled = mesh_boolean_exact(&[a, b], BooleanType::Intersect, &BooleanConfig::default()).unwrap();
    assert_eq!(pooled.mesh, first.mesh);
    assert_eq!(pooled.birth, first.birth);
}

#[test]
fn nested_difference_leaves_a_hollow_shell() {
    let outer = cuboid([2.0, 2.0, 2.0], [0.0, 0.0, 0.0]);
    let inner = cube([0.5, 0.5, 0.5]);
    let out = mesh_boolean(&outer, &inner, BooleanType::Minus, &BooleanConfig::sequential()).unwrap();
    assert!(out.valid);
    assert_eq!(out.mesh.face_count(), 24);
    assert_relative_eq!(out.mesh.signed_volume(), 7.0, epsilon = 1e-12);
    // the cavity faces point into the hole
    let flipped = out.birth.iter().filter(|&&b| b >= 12).count();
    assert_eq!(flipped, 12);
    assert!(is_compact(&out.mesh));

    let union = mesh_boolean(&outer, &inner, BooleanType::Union, &BooleanConfig::sequential()).unwrap();
    assert_eq!(union.mesh.face_count(), 12);
    assert!(union.birth.iter().all(|&b| b < 12));
}

#[test]
fn union_is_commutative() {
    let a = cube([0.0, 0.0, 0.0]);
    let b = cube([0.25, 0.5, 0.75]);
    let config = BooleanConfig::sequential();
    let ab = mesh_boolean(&a, &b, BooleanType::Union, &config).unwrap();
    let ba = mesh_boolean(&b, &a, BooleanType::Union, &config).unwrap();
    assert_eq!(ab.mesh.face_count(), ba.mesh.face_count());
    assert!(approx_eq(ab.mesh.signed_volume(), ba.mesh.signed_volume(), 1e-9));
    assert!(is_compact(&ab.mesh) && is_compact(&ba.mesh));

    // the same positions come out, only their order may differ
    let (a, b) = (a.to_exact().unwrap(), b.to_exact().unwrap());
    let ab = mesh_boolean_exact(&[a.clone(), b.clone()], BooleanType::Union, &config).unwrap();
    let ba = mesh_boolean_exact(&[b, a], BooleanType::Union, &config).unwrap();
    assert_eq!(sorted_vertices(&ab.mesh), sorted_vertices(&ba.mesh));
}

#[test]
fn xor_matches_both_differences() {
    let a = cube([0.0, 0.0, 0.0]);
    let b = cube([0.5, 0.25, 0.5]);
    let config = BooleanConfig::sequential();
    let xor = mesh_boolean(&a, &b, BooleanType::Xor, &config).unwrap();
    let ab = mesh_boolean(&a, &b, BooleanType::Minus, &config).unwrap();
    let ba = mesh_boolean(&b, &a, BooleanType::Minus, &config).unwrap();
    let both = mesh_boolean(&ab.mesh, &ba.mesh, BooleanType::Union, &config).unwrap();
    assert_relative_eq!(xor.mesh.signed_volume(), both.mesh.signed_volume(), epsilon = 1e-9);
    assert_relative_eq!(
        xor.mesh.signed_volume(),
        ab.mesh.signed_volume() + ba.mesh.signed_volume(),
        epsilon = 1e-9
    );
}

#[test]
fn n_ary_union_and_minus() {
    let cubes = [cube([0.0, 0.0, 0.0]), cube([3.0, 0.0, 0.0]), cube([6.0, 0.0, 0.0])];
    let config = BooleanConfig::default();
    let union = mesh_boolean_n(&cubes, BooleanType::Union, &config).unwrap();
    assert_eq!(union.mesh.face_count(), 36);
    assert!(is_compact(&union.mesh));
    assert_relative_eq!(union.mesh.signed_volume(), 3.0, epsilon = 1e-12);

    let slab = cuboid([7.0, 1.0, 1.0], [0.0, 0.0, 0.0]);
    let minus = mesh_boolean_n(&[slab, cubes[0].clone(), cubes[2].clone()], BooleanType::Minus, &config).unwrap();
    assert!(minus.valid);
    assert_relative_eq!(minus.mesh.signed_volume(), 5.0, epsilon = 1e-12);
}

#[test]
fn custom_operation_matches_intersection() {
    let meshes = [cube([0.0, 0.0, 0.0]), cube([0.5, 0.5, 0.5])];
    let combined = combine(&meshes);
    let config = BooleanConfig::sequential();
    let both = WindingNumberOp::custom(|w| w.iter().all(|&w| w > 0));
    let custom = mesh_boolean_custom(&combined.mesh, &combined.face_sizes, &both, &KeepRule::Inside, &config).unwrap();
    let named = mesh_boolean_n(&meshes, BooleanType::Intersect, &config).unwrap();
    assert_eq!(custom.mesh, named.mesh);
    assert_eq!(custom.birth, named.birth);
    assert_relative_eq!(custom.mesh.signed_volume(), 0.125, epsilon = 1e-12);
}

#[test]
fn operations_by_name() {
    let a = cube([0.0, 0.0, 0.0]);
    let b = cube([3.0, 0.0, 0.0]);
    let config = BooleanConfig::default();
    let union = mesh_boolean_str(&a, &b, "unite", &config).unwrap();
    assert_eq!(union.mesh.face_count(), 24);
    let minus = mesh_boolean_str(&a, &b, "Subtract", &config).unwrap();
    assert_eq!(minus.mesh.face_count(), 12);
    assert_eq!(
        mesh_boolean_str(&a, &b, "weld", &config).map(|out| out.valid),
        Err(BooleanError::UnknownOperation("weld".to_string()))
    );
}

#[test]
fn births_point_at_input_faces() {
    let a = cube([0.0, 0.0, 0.0]);
    let b = cube([0.5, 0.5, 0.5]);
    let out = mesh_boolean(&a, &b, BooleanType::Union, &BooleanConfig::sequential()).unwrap();
    assert_eq!(out.birth.len(), out.mesh.face_count());
    assert!(out.birth.iter().all(|&f| f < 24));
    assert!(out.birth.iter().any(|&f| f < 12));
    assert!(out.birth.iter().any(|&f| f >= 12));
    assert_eq!(out.stats.output_faces, out.mesh.face_count());
    assert_eq!(out.stats.input_faces, 24);
}

#[test]
fn bad_input_is_rejected() {
    let config = BooleanConfig::default();
    let mut nan = cube([0.0, 0.0, 0.0]);
    nan.vertices[3] = Point3::new(f64::NAN, 0.0, 0.0);
    assert_eq!(
        mesh_boolean(&nan, &cube([3.0, 0.0, 0.0]), BooleanType::Union, &config).map(|out| out.valid),
        Err(BooleanError::NonFiniteCoordinate { vertex: 3 })
    );

    let broken = TriMesh::new(vec![Point3::origin()], vec![[0, 1, 2]]);
    assert!(matches!(
        mesh_boolean(&broken, &TriMesh::default(), BooleanType::Union, &config),
        Err(BooleanError::FaceIndexOutOfRange { face: 0, index: 1, .. })
    ));
}

#[test]
fn empty_inputs_give_an_empty_valid_result() {
    let out = mesh_boolean_exact(
        &[ExactMesh::default(), ExactMesh::default()],
        BooleanType::Union,
        &BooleanConfig::default(),
    )
    .unwrap();
    assert!(out.valid);
    assert!(out.mesh.faces.is_empty());
    assert!(out.mesh.signed_volume_x6().is_zero());
}

#[test]
fn open_input_is_flagged_but_not_an_error() {
    let mut open = cube([0.0, 0.0, 0.0]);
    open.faces.truncate(10);
    let out = mesh_boolean(&open, &cube([3.0, 0.0, 0.0]), BooleanType::Union, &BooleanConfig::default()).unwrap();
    assert!(!out.valid);
}
