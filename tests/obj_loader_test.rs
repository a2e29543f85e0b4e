mod common;

use instanced_fly::{
    data_structures::instance::InstanceSet,
    resources::mesh::parse_obj,
};

use crate::common::test_utils::MockDevice;

const QUAD: &str = "\
# two triangles
v -0.5 -0.5 0.0
v 0.5 -0.5 0.0
v 0.5 0.5 0.0
v -0.5 0.5 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1
f 3/3/1 4/4/1 1/1/1
";

#[test]
fn triangulated_quad_loads() {
    let mesh = parse_obj("quad.obj", QUAD).unwrap();
    assert_eq!(mesh.name(), "quad.obj");
    assert_eq!(mesh.vertices().len(), 4);
    assert_eq!(mesh.num_elements(), 6);
    for v in mesh.vertices() {
        assert_eq!(v.normal, [0.0, 0.0, 1.0]);
    }
    let top_right = mesh
        .vertices()
        .iter()
        .find(|v| v.position == [0.5, 0.5, 0.0])
        .unwrap();
    assert_eq!(top_right.tex_coords, [1.0, 1.0]);
}

#[test]
fn loaded_mesh_feeds_an_instance_set() {
    let device = MockDevice::new();
    let mesh = parse_obj("quad.obj", QUAD).unwrap();
    let set = InstanceSet::new(&device, "obj", mesh, 100);
    assert_eq!(set.instance_count(), 100);
    assert_eq!(set.mesh_buffers().num_elements, 6);
    assert_eq!(set.mesh_buffers().index_buffer.indices.len(), 6);
}

#[test]
fn positions_only_default_the_rest_to_zero() {
    let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    let mesh = parse_obj("bare", text).unwrap();
    assert_eq!(mesh.num_elements(), 3);
    for v in mesh.vertices() {
        assert_eq!(v.tex_coords, [0.0, 0.0]);
        assert_eq!(v.normal, [0.0, 0.0, 0.0]);
    }
}

#[test]
fn malformed_float_is_an_error() {
    let text = "v 0 0 0\nv 1 zero 0\nv 0 1 0\nf 1 2 3\n";
    assert!(parse_obj("broken", text).is_err());
}

#[test]
fn polygons_are_rejected() {
    let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
    let err = parse_obj("ngon", text).unwrap_err();
    assert!(format!("{:#}", err).contains("4 vertices"));
}

#[test]
fn out_of_range_reference_is_an_error() {
    let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 7\n";
    assert!(parse_obj("dangling", text).is_err());
}

#[test]
fn multiple_objects_are_merged() {
    let text = "\
o first
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o second
v 0 0 1
v 1 0 1
v 0 1 1
f 4 5 6
";
    let mesh = parse_obj("two", text).unwrap();
    assert_eq!(mesh.vertices().len(), 6);
    assert_eq!(mesh.indices(), &[0, 1, 2, 3, 4, 5]);
    assert_eq!(mesh.vertices()[3].position, [0.0, 0.0, 1.0]);
}
