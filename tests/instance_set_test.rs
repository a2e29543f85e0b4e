mod common;

use cgmath::{Matrix4, SquareMatrix, Vector3};
use instanced_fly::data_structures::instance::{BestEffort, InstanceError, InstanceSet};

use crate::common::test_utils::{DrawRecorder, MockDevice, assert_vec3_near, quad_set, unit_quad};

#[test]
fn quad_scenario_uploads_and_shifts_on_removal() {
    let device = MockDevice::new();
    let mut set = quad_set(&device);
    assert_eq!(set.mesh().vertices().len(), 4);
    assert_eq!(set.mesh().num_elements(), 6);

    for _ in 0..3 {
        set.add_instance(Matrix4::identity());
    }
    set.set_position(1, Vector3::new(2.0, 0.0, 0.0)).unwrap();
    assert!(set.synchronize(&device, false));
    assert_eq!(set.generation(), 1);

    let uploaded = set.instance_buffer().matrices();
    assert_eq!(uploaded.len(), 3);
    assert_eq!(uploaded[0], Matrix4::identity());
    assert_eq!(uploaded[1], Matrix4::from_translation(Vector3::new(2.0, 0.0, 0.0)));
    assert_eq!(uploaded[2], Matrix4::identity());

    set.remove_instance(0).unwrap();
    assert!(set.synchronize(&device, false));
    assert_eq!(set.generation(), 2);
    let uploaded = set.instance_buffer().matrices();
    assert_eq!(uploaded.len(), 2);
    assert_eq!(uploaded[0], Matrix4::from_translation(Vector3::new(2.0, 0.0, 0.0)));
}

#[test]
fn repeated_identical_edits_upload_once() {
    let device = MockDevice::new();
    let mut set = quad_set(&device);
    set.add_instance(Matrix4::identity());
    set.synchronize(&device, false);
    let before = set.generation();

    let p = Vector3::new(1.0, 2.0, 3.0);
    set.set_position(0, p).unwrap();
    assert!(set.is_dirty());
    set.synchronize(&device, false);
    set.set_position(0, p).unwrap();
    assert!(!set.is_dirty());
    assert!(!set.synchronize(&device, false));
    assert_eq!(set.generation(), before + 1);
}

#[test]
fn back_to_back_synchronize_is_a_no_op() {
    let device = MockDevice::new();
    let mut set = InstanceSet::new(&device, "quad", unit_quad(), 2);
    set.set_uniform_scale(1, 3.0).unwrap();
    assert!(set.synchronize(&device, false));
    assert!(!set.synchronize(&device, false));
    assert_eq!(set.generation(), 1);
    assert_eq!(device.instance_writes.get(), 1);
}

#[test]
fn forced_synchronize_uploads_a_clean_set() {
    let device = MockDevice::new();
    let mut set = InstanceSet::new(&device, "quad", unit_quad(), 1);
    assert!(!set.is_dirty());
    assert!(set.synchronize(&device, true));
    assert_eq!(set.generation(), 1);
    assert_eq!(device.instance_writes.get(), 1);
}

#[test]
fn edits_equal_to_current_matrix_stay_clean() {
    let device = MockDevice::new();
    let mut set = InstanceSet::new(&device, "quad", unit_quad(), 1);
    set.set_position(0, Vector3::new(0.0, 0.0, 0.0)).unwrap();
    set.set_transform(0, Matrix4::identity()).unwrap();
    set.scale_by(0, Vector3::new(1.0, 1.0, 1.0)).unwrap();
    set.rotate(0, Vector3::new(0.0, 0.0, 0.0)).unwrap();
    assert!(!set.is_dirty());
    assert_eq!(set.generation(), 0);
}

#[test]
fn new_set_starts_clean_with_identity_instances() {
    let device = MockDevice::new();
    let set = InstanceSet::new(&device, "cubes", unit_quad(), 5);
    assert_eq!(set.instance_count(), 5);
    assert!(!set.is_dirty());
    assert_eq!(set.generation(), 0);
    assert_eq!(set.instance_buffer().matrices(), vec![Matrix4::identity(); 5]);
    assert_eq!(set.instance_buffer().label, "cubes Instance Buffer");
    assert_eq!(device.buffers_created.get(), 3);
}

#[test]
fn removal_shifts_later_indices_down() {
    let device = MockDevice::new();
    let mut set = quad_set(&device);
    let a = set.add_instance_at(Vector3::new(1.0, 0.0, 0.0));
    let b = set.add_instance_at(Vector3::new(2.0, 0.0, 0.0));
    let c = set.add_instance_at(Vector3::new(3.0, 0.0, 0.0));
    assert_eq!((a, b, c), (0, 1, 2));

    let second = set.position(1).unwrap();
    let removed = set.remove_instance(0).unwrap();
    assert_eq!(removed, Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0)));
    assert_eq!(set.instance_count(), 2);
    assert_eq!(set.position(0).unwrap(), second);
    assert_eq!(set.position(1).unwrap(), Vector3::new(3.0, 0.0, 0.0));
}

#[test]
fn position_round_trips_through_rotation_and_scale() {
    let device = MockDevice::new();
    let mut set = quad_set(&device);
    set.add_instance(Matrix4::identity());
    set.set_rotation(0, Vector3::new(10.0, 70.0, -40.0)).unwrap();
    set.set_scale(0, Vector3::new(2.0, 0.5, 3.0)).unwrap();

    for t in [
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(2.5, -1.0, 1e4),
        Vector3::new(-0.125, 7.0, 3.3),
    ] {
        set.set_position(0, t).unwrap();
        assert_vec3_near(set.position(0).unwrap(), t, 1e-5);
    }
    assert_vec3_near(set.scale(0).unwrap(), Vector3::new(2.0, 0.5, 3.0), 1e-5);
}

#[test]
fn rotation_reads_back_euler_angles() {
    let device = MockDevice::new();
    let mut set = quad_set(&device);
    set.add_instance_at(Vector3::new(4.0, 5.0, 6.0));
    set.set_uniform_scale(0, 2.0).unwrap();
    set.set_rotation(0, Vector3::new(10.0, 20.0, 30.0)).unwrap();

    assert_vec3_near(set.rotation(0).unwrap(), Vector3::new(10.0, 20.0, 30.0), 1e-3);
    assert_vec3_near(set.scale(0).unwrap(), Vector3::new(2.0, 2.0, 2.0), 1e-5);
    assert_vec3_near(set.position(0).unwrap(), Vector3::new(4.0, 5.0, 6.0), 1e-6);
}

#[test]
fn axis_angle_rotation_about_y() {
    let device = MockDevice::new();
    let mut set = InstanceSet::new(&device, "quad", unit_quad(), 1);
    set.set_rotation_axis(0, 45.0, Vector3::new(0.0, 2.0, 0.0)).unwrap();
    assert_vec3_near(set.rotation(0).unwrap(), Vector3::new(0.0, 45.0, 0.0), 1e-3);
}

#[test]
fn relative_rotation_and_scale_accumulate() {
    let device = MockDevice::new();
    let mut set = InstanceSet::new(&device, "quad", unit_quad(), 1);
    set.rotate(0, Vector3::new(0.0, 30.0, 0.0)).unwrap();
    set.rotate(0, Vector3::new(0.0, 30.0, 0.0)).unwrap();
    assert_vec3_near(set.rotation(0).unwrap(), Vector3::new(0.0, 60.0, 0.0), 1e-3);

    set.scale_by(0, Vector3::new(2.0, 2.0, 2.0)).unwrap();
    set.scale_by(0, Vector3::new(1.5, 1.5, 1.5)).unwrap();
    assert_vec3_near(set.scale(0).unwrap(), Vector3::new(3.0, 3.0, 3.0), 1e-5);
}

#[test]
fn repeating_rotation_or_scale_leaves_the_set_clean() {
    let device = MockDevice::new();
    let cases = [
        (Vector3::new(10.0, 20.0, 30.0), Vector3::new(2.0, 2.0, 2.0)),
        (Vector3::new(-45.0, 60.0, 15.0), Vector3::new(0.5, 3.0, 1.25)),
        (Vector3::new(90.0, -33.0, 170.0), Vector3::new(7.0, 0.1, 4.0)),
        (Vector3::new(0.0, 180.0, 0.0), Vector3::new(1.0, 2.0, 3.0)),
        (Vector3::new(123.0, 45.0, -75.0), Vector3::new(0.3, 0.3, 9.0)),
    ];
    for (angles, scale) in cases {
        let mut set = InstanceSet::new(&device, "quad", unit_quad(), 1);
        set.set_position(0, Vector3::new(1.0, -2.0, 3.0)).unwrap();
        set.set_scale(0, scale).unwrap();
        set.set_rotation(0, angles).unwrap();
        set.synchronize(&device, false);

        set.set_rotation(0, angles).unwrap();
        assert!(!set.is_dirty(), "set_rotation({:?}) dirtied the set", angles);
        set.set_scale(0, scale).unwrap();
        assert!(!set.is_dirty(), "set_scale({:?}) dirtied the set", scale);
        set.set_rotation_axis(0, 30.0, Vector3::new(1.0, 1.0, 0.0)).unwrap();
        set.synchronize(&device, false);
        set.set_rotation_axis(0, 30.0, Vector3::new(1.0, 1.0, 0.0)).unwrap();
        assert!(!set.is_dirty());
        assert!(!set.synchronize(&device, false));
    }
}

#[test]
fn collapsed_scale_can_be_restored() {
    let device = MockDevice::new();
    let mut set = InstanceSet::new(&device, "quad", unit_quad(), 1);
    set.set_uniform_scale(0, 0.0).unwrap();
    assert_eq!(set.scale(0).unwrap(), Vector3::new(0.0, 0.0, 0.0));
    set.set_uniform_scale(0, 2.0).unwrap();
    assert_vec3_near(set.scale(0).unwrap(), Vector3::new(2.0, 2.0, 2.0), 1e-6);
}

#[test]
fn out_of_range_index_is_reported_and_changes_nothing() {
    let device = MockDevice::new();
    let mut set = InstanceSet::new(&device, "quad", unit_quad(), 2);

    let err = set.set_position(5, Vector3::new(1.0, 1.0, 1.0)).unwrap_err();
    assert_eq!(err, InstanceError::OutOfRange { index: 5, len: 2 });
    assert!(set.remove_instance(2).is_err());
    assert!(set.rotate(9, Vector3::new(0.0, 10.0, 0.0)).best_effort().is_none());
    assert!(set.rotation(2).is_err());
    assert!(set.scale(2).is_err());
    assert!(!set.is_dirty());
    assert_eq!(set.instance_count(), 2);

    assert_eq!(set.position_or_sentinel(7), Vector3::new(-1.0, -1.0, -1.0));
    assert_eq!(set.position_or_sentinel(0), Vector3::new(0.0, 0.0, 0.0));
}

#[test]
fn empty_set_draws_nothing() {
    let device = MockDevice::new();
    let mut set = quad_set(&device);
    let mut recorder = DrawRecorder::default();

    set.draw(&mut recorder);
    set.synchronize(&device, true);
    set.draw(&mut recorder);
    assert!(recorder.calls.is_empty());
}

#[test]
fn draw_covers_only_uploaded_instances() {
    let device = MockDevice::new();
    let mut set = quad_set(&device);
    let mut recorder = DrawRecorder::default();

    set.add_instance(Matrix4::identity());
    set.add_instance(Matrix4::identity());
    set.draw(&mut recorder);
    assert!(recorder.calls.is_empty());

    set.synchronize(&device, false);
    set.draw(&mut recorder);
    assert_eq!(recorder.calls.len(), 1);
    assert_eq!(recorder.calls[0].instances, 0..2);
    assert_eq!(recorder.calls[0].num_elements, 6);
    assert_eq!(recorder.calls[0].mesh_label, "square Vertex Buffer");

    set.remove_instance(0).unwrap();
    set.draw(&mut recorder);
    assert_eq!(recorder.calls[1].instances, 0..1);
}
