//! End-to-end tests driving the host the way a plugin would: class
//! registration, pooled allocation, boundary values, serialization,
//! and the auxiliary host services.

use std::any::Any;

use tessera_core::component::{
    CapabilitySet, Component, ComponentBox, ComponentHeader, Opcode, PoolHint, PoolPriority,
    ValidationTag,
};
use tessera_core::host::{
    pack_version, HostApi, HostError, InstantiationPolicy, HOST_INTERFACE_VERSION,
};
use tessera_core::ids::{
    ClassId, ContextId, CLID_INTARRAY, CLID_INTEGER, CLID_LIST, CLID_OBJECT, CLID_STRING,
    CLID_TREENODE,
};
use tessera_core::stream::Stream;
use tessera_core::value::{TypeTag, Value};
use tessera_core::serial;

use tessera_host::builtins::{BufferObj, HashTableObj, ListObj, TreeNodeObj};
use tessera_host::plugin::PluginDescriptor;
use tessera_host::Host;

// ----------------------------------------------------------------------
// A plugin-style class pair used across the tests
// ----------------------------------------------------------------------

struct Envelope {
    header: ComponentHeader,
    attack: f32,
    release: f32,
}

impl Envelope {
    fn new() -> Self {
        Envelope {
            header: ComponentHeader::new(ClassId(0)),
            attack: 0.0,
            release: 0.0,
        }
    }
}

impl Component for Envelope {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }
    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }
    fn class_name(&self) -> &str {
        "Envelope"
    }
    fn parent_class_name(&self) -> Option<&str> {
        Some("Object")
    }
    fn spawn(&self) -> ComponentBox {
        let mut obj = Envelope::new();
        obj.header.set_class_id(self.header.class_id());
        Box::new(obj)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::SERIALIZATION
    }
    fn copy_from(&mut self, other: &dyn Component) -> bool {
        match other.as_any().downcast_ref::<Envelope>() {
            Some(src) => {
                self.attack = src.attack;
                self.release = src.release;
                true
            }
            None => false,
        }
    }
    fn equals(&self, other: &dyn Component) -> bool {
        other
            .as_any()
            .downcast_ref::<Envelope>()
            .is_some_and(|o| o.attack == self.attack && o.release == self.release)
    }
    fn reinit(&mut self) {
        self.attack = 0.0;
        self.release = 0.0;
    }
    fn pool_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }
    fn pool_priority(&self) -> PoolPriority {
        PoolPriority::Medium
    }
    fn serialize_fields(
        &self,
        stream: &mut dyn Stream,
    ) -> Result<(), tessera_core::stream::StreamError> {
        stream.write_f32(self.attack)?;
        stream.write_f32(self.release)
    }
    fn deserialize_fields(
        &mut self,
        stream: &mut dyn Stream,
        _host: &dyn HostApi,
    ) -> Result<(), tessera_core::stream::StreamError> {
        self.attack = stream.read_f32()?;
        self.release = stream.read_f32()?;
        Ok(())
    }
}

/// Child class of `Envelope`, for ancestry checks.
struct AdsrEnvelope {
    header: ComponentHeader,
}

impl Component for AdsrEnvelope {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }
    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }
    fn class_name(&self) -> &str {
        "AdsrEnvelope"
    }
    fn parent_class_name(&self) -> Option<&str> {
        Some("Envelope")
    }
    fn spawn(&self) -> ComponentBox {
        Box::new(AdsrEnvelope {
            header: ComponentHeader::new(self.header.class_id()),
        })
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn host_with_envelopes() -> (Host, ClassId, ClassId) {
    let host = Host::new().unwrap();
    let env_id = host
        .register_class(Box::new(Envelope::new()), InstantiationPolicy::Normal)
        .unwrap();
    let adsr_id = host
        .register_class(
            Box::new(AdsrEnvelope {
                header: ComponentHeader::new(ClassId(0)),
            }),
            InstantiationPolicy::Normal,
        )
        .unwrap();
    (host, env_id, adsr_id)
}

// ----------------------------------------------------------------------
// Registration and lifetime
// ----------------------------------------------------------------------

#[test]
fn test_register_instantiate_delete() {
    let (host, env_id, _) = host_with_envelopes();
    assert_eq!(host.class_id_by_name("Envelope"), Some(env_id));
    assert_eq!(host.class_name_by_id(env_id).as_deref(), Some("Envelope"));

    let baseline = host.allocation_count();
    let obj = host.new_by_class_id(env_id).unwrap();
    assert!(obj.header().tag().is_valid());
    assert_eq!(obj.header().class_id(), env_id);
    assert_eq!(host.allocation_count(), baseline + 1);

    host.delete_component(obj).unwrap();
    assert_eq!(host.allocation_count(), baseline);
}

#[test]
fn test_stale_tag_release_detected() {
    let (host, env_id, _) = host_with_envelopes();
    let mut obj = host.new_by_class_id(env_id).unwrap();
    // Simulate a stale reference surviving a release elsewhere.
    obj.header_mut().set_tag(ValidationTag::Invalid);
    assert!(matches!(
        host.delete_component(obj),
        Err(HostError::DoubleRelease)
    ));
}

#[test]
fn test_static_class_not_instantiable() {
    let host = Host::new().unwrap();
    let id = host
        .register_class(Box::new(Envelope::new()), InstantiationPolicy::Static)
        .unwrap();
    assert!(matches!(
        host.new_by_class_id(id),
        Err(HostError::NotInstantiable(_))
    ));
    assert!(matches!(
        host.new_pooled_by_class_id(id, PoolHint::Default),
        Err(HostError::NotInstantiable(_))
    ));
}

#[test]
fn test_unknown_class_refused() {
    let host = Host::new().unwrap();
    assert!(matches!(
        host.new_by_class_id(ClassId(200)),
        Err(HostError::UnknownClass(_))
    ));
}

#[test]
fn test_clone_component_copies_state() {
    let (host, env_id, _) = host_with_envelopes();
    let mut original = host.new_by_class_id(env_id).unwrap();
    {
        let env = original.as_any_mut().downcast_mut::<Envelope>().unwrap();
        env.attack = 0.25;
        env.release = 1.5;
    }
    let copy = host.clone_component(original.as_ref()).unwrap();
    assert!(copy.equals(original.as_ref()));
    host.delete_component(original).unwrap();
    host.delete_component(copy).unwrap();
}

// ----------------------------------------------------------------------
// Ancestry
// ----------------------------------------------------------------------

#[test]
fn test_is_instance_walks_hierarchy() {
    let (host, env_id, adsr_id) = host_with_envelopes();
    let obj = host.new_by_class_id(adsr_id).unwrap();
    assert!(host.is_instance(Some(obj.as_ref()), adsr_id));
    assert!(host.is_instance(Some(obj.as_ref()), env_id));
    assert!(host.is_instance(Some(obj.as_ref()), CLID_OBJECT));
    assert!(!host.is_instance(Some(obj.as_ref()), CLID_INTEGER));
    assert!(!host.is_instance(None, env_id));
    host.delete_component(obj).unwrap();
}

#[test]
fn test_is_instance_false_for_invalidated_object() {
    let (host, env_id, _) = host_with_envelopes();
    let mut obj = host.new_by_class_id(env_id).unwrap();
    obj.header_mut().set_tag(ValidationTag::Invalid);
    assert!(!host.is_instance(Some(obj.as_ref()), env_id));
}

// ----------------------------------------------------------------------
// Pooling
// ----------------------------------------------------------------------

#[test]
fn test_pool_recycles_slots() {
    let (host, env_id, _) = host_with_envelopes();
    let a = host.new_pooled_by_class_id(env_id, PoolHint::Default).unwrap();
    let b = host.new_pooled_by_class_id(env_id, PoolHint::Default).unwrap();
    let slot_b = b.header().pool_handle().unwrap().slot;
    host.delete_component(a).unwrap();
    host.delete_component(b).unwrap();
    assert_eq!(host.pool_free_slots(env_id, PoolHint::Default), 2);

    let c = host.new_pooled_by_class_id(env_id, PoolHint::Default).unwrap();
    assert_eq!(c.header().pool_handle().unwrap().slot, slot_b);
    assert!(c.header().tag().is_valid());
    host.delete_component(c).unwrap();
}

#[test]
fn test_pool_round_trip_is_heap_neutral() {
    let (host, env_id, _) = host_with_envelopes();
    // Prime one slot so the loop below runs entirely on recycling.
    let primer = host
        .new_pooled_by_class_id(env_id, PoolHint::Temporary)
        .unwrap();
    host.delete_component(primer).unwrap();

    let allocations = host.allocation_count();
    let free_slots = host.pool_free_slots(env_id, PoolHint::Temporary);
    for _ in 0..32 {
        let obj = host
            .new_pooled_by_class_id(env_id, PoolHint::Temporary)
            .unwrap();
        host.delete_component(obj).unwrap();
    }
    assert_eq!(host.allocation_count(), allocations);
    assert_eq!(host.pool_free_slots(env_id, PoolHint::Temporary), free_slots);
}

#[test]
fn test_recycled_instance_carries_no_stale_state() {
    let (host, env_id, _) = host_with_envelopes();
    let mut obj = host.new_pooled_by_class_id(env_id, PoolHint::Default).unwrap();
    obj.as_any_mut().downcast_mut::<Envelope>().unwrap().attack = 9.0;
    host.delete_component(obj).unwrap();

    let obj = host.new_pooled_by_class_id(env_id, PoolHint::Default).unwrap();
    assert_eq!(obj.as_any().downcast_ref::<Envelope>().unwrap().attack, 0.0);
    host.delete_component(obj).unwrap();
}

// ----------------------------------------------------------------------
// Boundary values
// ----------------------------------------------------------------------

#[test]
fn test_value_transfer_releases_exactly_once() {
    let host = Host::new().unwrap();
    let baseline = host.allocation_count();

    let mut v1 = Value::owned(host.new_by_class_id(CLID_INTEGER).unwrap());
    assert_eq!(host.allocation_count(), baseline + 1);
    assert!(v1.is_owning());

    let mut v2 = v1.take();
    assert!(!v1.is_owning());
    assert!(v2.is_owning());
    assert!(v1.as_object().is_some());

    v1.unset(&host);
    assert_eq!(host.allocation_count(), baseline + 1);
    v2.unset(&host);
    assert_eq!(host.allocation_count(), baseline);
}

#[test]
fn test_typecast_boxes_and_unboxes() {
    let host = Host::new().unwrap();

    let mut value = Value::Int(5);
    value.typecast(TypeTag::Object, &host).unwrap();
    let obj = value.as_object().unwrap();
    assert!(host.is_instance(Some(obj), CLID_INTEGER));
    assert!(host.is_instance(Some(obj), CLID_OBJECT));

    value.typecast(TypeTag::String, &host).unwrap();
    assert!(matches!(&value, Value::Str(s) if s == "5"));

    value.typecast(TypeTag::Object, &host).unwrap();
    let obj = value.as_object().unwrap();
    assert!(host.is_instance(Some(obj), CLID_STRING));
    value.typecast(TypeTag::Int, &host).unwrap();
    assert_eq!(value.get_i32(), 5);
}

#[test]
fn test_operator_dispatch_through_values() {
    let host = Host::new().unwrap();
    let mut acc = host.new_by_class_id(CLID_INTEGER).unwrap();
    acc.set_i32(10);
    let mut rhs = host.new_by_class_id(CLID_INTEGER).unwrap();
    rhs.set_i32(4);

    let mut out = Value::Void;
    acc.operate(Opcode::Sub, Some(rhs.as_ref()), &mut out);
    assert_eq!(acc.scan_i32(), Some(6));
    acc.operate(Opcode::CmpGt, Some(rhs.as_ref()), &mut out);
    assert_eq!(out.get_i32(), 1);

    host.delete_component(acc).unwrap();
    host.delete_component(rhs).unwrap();
}

// ----------------------------------------------------------------------
// Serialization
// ----------------------------------------------------------------------

#[test]
fn test_serialize_round_trip_with_type_info() {
    let (host, env_id, _) = host_with_envelopes();
    let mut original = host.new_by_class_id(env_id).unwrap();
    {
        let env = original.as_any_mut().downcast_mut::<Envelope>().unwrap();
        env.attack = 0.01;
        env.release = 0.35;
    }

    let mut buffer = BufferObj::new();
    original.serialize(&mut buffer, true).unwrap();
    buffer.set_offset(0).unwrap();

    let restored = serial::read_component(&mut buffer, &host).unwrap();
    assert!(restored.equals(original.as_ref()));

    host.delete_component(original).unwrap();
    host.delete_component(restored).unwrap();
}

#[test]
fn test_type_probe_rewinds_on_mismatch() {
    let host = Host::new().unwrap();
    let mut int_obj = host.new_by_class_id(CLID_INTEGER).unwrap();
    int_obj.set_i32(77);

    let mut buffer = BufferObj::new();
    int_obj.serialize(&mut buffer, true).unwrap();
    buffer.set_offset(0).unwrap();

    let envelope = Envelope::new();
    assert!(!envelope.can_deserialize(&mut buffer));
    assert_eq!(buffer.offset(), 0);

    // The stream is still intact for the right reader.
    let mut readback = host.new_by_class_id(CLID_INTEGER).unwrap();
    readback.deserialize(&mut buffer, &host, true).unwrap();
    assert_eq!(readback.scan_i32(), Some(77));

    host.delete_component(int_obj).unwrap();
    host.delete_component(readback).unwrap();
}

#[test]
fn test_hash_table_round_trip_with_nested_object() {
    let host = Host::new().unwrap();
    let baseline = host.allocation_count();

    let mut table = host.new_by_class_id(host.class_id_by_name("HashTable").unwrap()).unwrap();
    table.hash_set("gain", Value::Float(0.5), &host);
    table.hash_set("label", Value::Str("master".into()), &host);
    let mut boxed = host.new_by_class_id(CLID_INTEGER).unwrap();
    boxed.set_i32(128);
    table.hash_set("size", Value::owned(boxed), &host);

    let mut buffer = BufferObj::new();
    table.serialize(&mut buffer, true).unwrap();
    buffer.set_offset(0).unwrap();
    let restored = serial::read_component(&mut buffer, &host).unwrap();
    assert!(restored.equals(table.as_ref()));

    let mut out = Value::Void;
    assert!(restored.hash_get("size", &mut out));
    assert_eq!(out.get_i32(), 128);
    assert!(!restored.hash_get("missing", &mut out));

    host.delete_component(table).unwrap();
    host.delete_component(restored).unwrap();
    // Nested owned payloads were released through the host.
    assert_eq!(host.allocation_count(), baseline);
}

#[test]
fn test_hash_remove_releases_owned_payload() {
    let host = Host::new().unwrap();
    let baseline = host.allocation_count();

    let mut table = HashTableObj::new();
    let inner = host.new_by_class_id(CLID_INTEGER).unwrap();
    table.hash_set("n", Value::owned(inner), &host);
    assert_eq!(host.allocation_count(), baseline + 1);
    assert!(table.hash_remove("n", &host));
    assert_eq!(host.allocation_count(), baseline);
    assert!(!table.hash_remove("n", &host));
    assert!(table.is_empty());
}

#[test]
fn test_typed_array_round_trip_and_indexing() {
    let host = Host::new().unwrap();
    let mut arr = host.new_by_class_id(CLID_INTARRAY).unwrap();
    assert!(arr.array_alloc(4));
    assert_eq!(arr.array_len(), Some(4));
    assert_eq!(arr.element_byte_size(), 4);
    for i in 0..4 {
        assert!(arr.array_set(i, Value::Int((i as i32 + 1) * 10), &host));
    }
    assert!(!arr.array_set(4, Value::Int(50), &host));

    let mut out = Value::Void;
    assert!(arr.array_get(2, &mut out));
    assert_eq!(out.get_i32(), 30);

    let mut buffer = BufferObj::new();
    arr.serialize(&mut buffer, true).unwrap();
    buffer.set_offset(0).unwrap();
    let restored = serial::read_component(&mut buffer, &host).unwrap();
    assert!(restored.equals(arr.as_ref()));

    host.delete_component(arr).unwrap();
    host.delete_component(restored).unwrap();
}

#[test]
fn test_list_releases_owned_entries() {
    let host = Host::new().unwrap();
    let baseline = host.allocation_count();

    let mut list = host.new_by_class_id(CLID_LIST).unwrap();
    {
        let list = list.as_any_mut().downcast_mut::<ListObj>().unwrap();
        let mut boxed = host.new_by_class_id(CLID_INTEGER).unwrap();
        boxed.set_i32(9);
        list.push_back(Value::owned(boxed));
        list.push_front(Value::Str("intro".into()));
    }
    assert_eq!(host.allocation_count(), baseline + 2);

    let mut out = Value::Void;
    assert!(list.array_get(1, &mut out));
    assert!(!out.is_owning());
    assert_eq!(out.get_i32(), 9);
    drop(out);

    // Deleting the list releases the owned entry through the host.
    host.delete_component(list).unwrap();
    assert_eq!(host.allocation_count(), baseline);
}

#[test]
fn test_tree_round_trip_preserves_shape() {
    let host = Host::new().unwrap();
    let mut root = host.new_by_class_id(CLID_TREENODE).unwrap();
    {
        let root = root.as_any_mut().downcast_mut::<TreeNodeObj>().unwrap();
        root.set_name("scene");
        root.set_value(Value::Int(1), &host);
        let mut left = TreeNodeObj::new();
        left.set_name("tracks");
        left.set_value(Value::Str("8".into()), &host);
        root.set_left(Some(left));
    }

    let mut buffer = BufferObj::new();
    root.serialize(&mut buffer, true).unwrap();
    buffer.set_offset(0).unwrap();
    let restored = serial::read_component(&mut buffer, &host).unwrap();
    assert!(restored.equals(root.as_ref()));

    host.delete_component(root).unwrap();
    host.delete_component(restored).unwrap();
}

// ----------------------------------------------------------------------
// Host services
// ----------------------------------------------------------------------

#[test]
fn test_exception_taxonomy_and_raise() {
    let host = Host::new().unwrap();
    let error = host.exception_id_by_name("Error").unwrap();
    let mismatch = host.exception_id_by_name("TypeMismatch").unwrap();
    let custom = host.exception_register("FilterFault", Some(mismatch)).unwrap();
    assert!(host.exception_is_a(custom, mismatch));
    assert!(host.exception_is_a(custom, error));
    assert!(!host.exception_is_a(error, custom));

    let ctx = ContextId::next();
    host.exception_raise(ctx, custom, "cutoff out of range", file!(), line!());
    let raised = host.take_raised(ctx);
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].name, "FilterFault");
    assert_eq!(raised[0].message, "cutoff out of range");
    assert!(host.take_raised(ctx).is_empty());
}

#[test]
fn test_callback_slot_round_trip() {
    fn bump(_host: &dyn HostApi, args: &mut [Value]) {
        if let Some(v) = args.first_mut() {
            let next = v.get_i32() + 1;
            v.set_i32(next);
        }
    }

    let host = Host::new().unwrap();
    let id = host.callback_create("on_render");
    assert_eq!(host.callback_id_by_name("on_render"), Some(id));
    assert!(host.callback_by_id(id).is_none());

    assert!(host.callback_bind(id, Some(bump)));
    let mut args = [Value::Int(41)];
    host.callback_by_id(id).unwrap()(&host, &mut args);
    assert_eq!(args[0].get_i32(), 42);
}

#[test]
fn test_host_mutex_service() {
    let host = Host::new().unwrap();
    let id = host.mutex_create(Some("render_lock"));
    assert_eq!(host.mutex_find_by_name("render_lock"), Some(id));
    host.mutex_lock(id).unwrap();
    host.mutex_unlock(id).unwrap();
    assert!(matches!(
        host.mutex_unlock(id),
        Err(HostError::MutexNotLocked(_))
    ));
    host.mutex_destroy(id).unwrap();
    assert_eq!(host.mutex_find_by_name("render_lock"), None);
}

// ----------------------------------------------------------------------
// Plugins
// ----------------------------------------------------------------------

fn synth_init(host: &dyn HostApi) -> Result<(), HostError> {
    host.register_class(Box::new(Envelope::new()), InstantiationPolicy::Normal)?;
    host.callback_create("on_patch_loaded");
    Ok(())
}

fn synth_exit(_host: &dyn HostApi) {}

#[test]
fn test_plugin_load_registers_surface() {
    let host = Host::new().unwrap();
    let descriptor = PluginDescriptor {
        name: "synth",
        version: pack_version(0, 3, 1),
        interface_version: HOST_INTERFACE_VERSION,
        init: synth_init,
        exit: synth_exit,
    };
    host.load_plugin(&descriptor).unwrap();
    assert_eq!(host.plugin_version("synth"), Some(pack_version(0, 3, 1)));
    assert!(host.class_id_by_name("Envelope").is_some());
    assert!(host.callback_id_by_name("on_patch_loaded").is_some());

    assert!(matches!(
        host.load_plugin(&descriptor),
        Err(HostError::PluginAlreadyLoaded(_))
    ));

    host.unload_plugin("synth").unwrap();
    assert_eq!(host.plugin_version("synth"), None);
    assert!(matches!(
        host.unload_plugin("synth"),
        Err(HostError::PluginNotLoaded(_))
    ));
}

#[test]
fn test_plugin_interface_version_gated() {
    let host = Host::new().unwrap();
    let descriptor = PluginDescriptor {
        name: "relic",
        version: pack_version(1, 0, 0),
        interface_version: pack_version(99, 0, 0),
        init: synth_init,
        exit: synth_exit,
    };
    assert!(matches!(
        host.load_plugin(&descriptor),
        Err(HostError::IncompatibleInterface { .. })
    ));
    assert_eq!(host.plugin_version("relic"), None);
}

#[test]
fn test_failed_plugin_init_leaves_host_clean() {
    fn failing_init(host: &dyn HostApi) -> Result<(), HostError> {
        host.register_class(Box::new(Envelope::new()), InstantiationPolicy::Normal)?;
        // Second registration under the same name fails.
        host.register_class(Box::new(Envelope::new()), InstantiationPolicy::Normal)?;
        Ok(())
    }

    let host = Host::new().unwrap();
    let descriptor = PluginDescriptor {
        name: "broken",
        version: pack_version(0, 1, 0),
        interface_version: HOST_INTERFACE_VERSION,
        init: failing_init,
        exit: synth_exit,
    };
    assert!(host.load_plugin(&descriptor).is_err());
    assert_eq!(host.plugin_version("broken"), None);
}
