//! Shared fixture: a bridge wired to the in-memory runtime and engine with a
//! small class library.

#![allow(dead_code)]

use std::sync::Arc;

use conduit_bridge::{Bridge, BridgeBindings, BridgeConfig, BridgeError, BridgeResult, ConstructorArgs};
use conduit_harness::{ClassBuilder, InMemoryEngine, InMemoryRuntime};
use conduit_sdk::{
    CallTarget, Dispatch, JsEngine, JsObjectId, JsValue, ManagedRuntime, ManagedValue, MetadataEntry,
    ObjectHandle,
};
use parking_lot::Mutex;

pub const WIDGET: &str = "com.example.Widget";
pub const LABELED: &str = "com.example.Labeled";
pub const RUNNABLE: &str = "java.lang.Runnable";
pub const RUNNER: &str = "com.example.Runner";

pub struct Fixture {
    pub runtime: Arc<InMemoryRuntime>,
    pub engine: Arc<InMemoryEngine>,
    pub bridge: Arc<Bridge>,
    pub exits: Arc<Mutex<Vec<i32>>>,
}

pub fn fixture() -> Fixture {
    fixture_with(BridgeConfig::default())
}

pub fn fixture_with(config: BridgeConfig) -> Fixture {
    let runtime = Arc::new(InMemoryRuntime::new());
    define_classes(&runtime);
    let engine = Arc::new(InMemoryEngine::new());

    let exits = Arc::new(Mutex::new(Vec::new()));
    let recorded = exits.clone();
    let bindings = BridgeBindings::new(runtime.clone(), engine.clone())
        .with_config(config)
        .with_exit_hook(move |code| recorded.lock().push(code));
    let bridge = Bridge::init(bindings).unwrap();

    let weak = bridge.downgrade();
    runtime.set_js_callback(Arc::new(
        move |receiver: ObjectHandle, method: &str, args: &[ManagedValue], ret: &str| -> BridgeResult<ManagedValue> {
            let bridge = weak.upgrade().ok_or(BridgeError::ShutDown)?;
            bridge.call_js_method(receiver, method, args, ret)
        },
    ));

    Fixture {
        runtime,
        engine,
        bridge,
        exits,
    }
}

fn this_field(rt: &InMemoryRuntime, this: Option<ObjectHandle>, class: &str, name: &str, sig: &str) -> BridgeResult<ManagedValue> {
    let this = this.ok_or(BridgeError::UnknownHandle(0))?;
    rt.get_field(CallTarget::Instance(this), &MetadataEntry::field(class, name, sig))
}

fn define_classes(runtime: &InMemoryRuntime) {
    runtime
        .define_class(
            ClassBuilder::new(WIDGET)
                .field("size", "I")
                .final_field("id", "J")
                .static_field("COUNT", "I", ManagedValue::Int(7))
                .constructor("()V", |_, _, _| Ok(ManagedValue::Void))
                .constructor("(I)V", |rt, this, args| {
                    let this = this.ok_or(BridgeError::UnknownHandle(0))?;
                    rt.set_field(
                        CallTarget::Instance(this),
                        &MetadataEntry::field(WIDGET, "size", "I"),
                        args[0].clone(),
                    )?;
                    Ok(ManagedValue::Void)
                })
                .method("getSize", "()I", |rt, this, _| this_field(rt, this, WIDGET, "size", "I"))
                .method("setSize", "(I)V", |rt, this, args| {
                    let this = this.ok_or(BridgeError::UnknownHandle(0))?;
                    rt.set_field(
                        CallTarget::Instance(this),
                        &MetadataEntry::field(WIDGET, "size", "I"),
                        args[0].clone(),
                    )?;
                    Ok(ManagedValue::Void)
                })
                .method("label", "()Ljava/lang/String;", |_, _, _| {
                    Ok(ManagedValue::String("widget".to_string()))
                })
                .method("describe", "()Ljava/lang/String;", |rt, this, _| {
                    let this = this.ok_or(BridgeError::UnknownHandle(0))?;
                    let label = rt.call_method(
                        CallTarget::Instance(this),
                        &MetadataEntry::method(WIDGET, "label", "()Ljava/lang/String;"),
                        Dispatch::Virtual,
                        &[],
                    )?;
                    match label {
                        ManagedValue::String(s) => Ok(ManagedValue::String(format!("<{}>", s))),
                        other => Ok(ManagedValue::String(format!("<{}>", other.type_name()))),
                    }
                })
                .method("self", "()Lcom/example/Widget;", |_, this, _| {
                    Ok(this.map_or(ManagedValue::Null, ManagedValue::Object))
                })
                .method("fail", "()V", |_, _, _| {
                    Err(BridgeError::managed("java.lang.IllegalStateException", "boom"))
                })
                .method("scale", "(JD)D", |rt, this, args| {
                    let size = match this_field(rt, this, WIDGET, "size", "I")? {
                        ManagedValue::Int(s) => s as f64,
                        _ => 0.0,
                    };
                    match (&args[0], &args[1]) {
                        (ManagedValue::Long(l), ManagedValue::Double(d)) => {
                            Ok(ManagedValue::Double(size * (*l as f64) * d))
                        }
                        _ => Err(BridgeError::managed("java.lang.IllegalArgumentException", "bad args")),
                    }
                })
                .static_method("twice", "(I)I", |_, _, args| match args[0] {
                    ManagedValue::Int(v) => Ok(ManagedValue::Int(v * 2)),
                    _ => Err(BridgeError::managed("java.lang.IllegalArgumentException", "int expected")),
                })
                .static_method("big", "()J", |_, _, _| Ok(ManagedValue::Long(i64::MAX))),
        )
        .unwrap();

    runtime
        .define_class(
            ClassBuilder::new(LABELED)
                .field("name", "Ljava/lang/String;")
                .method("label", "()Ljava/lang/String;", |_, _, _| {
                    Ok(ManagedValue::String("default".to_string()))
                })
                .constructor("()V", |rt, this, _| {
                    let this = this.ok_or(BridgeError::UnknownHandle(0))?;
                    let label = rt.call_method(
                        CallTarget::Instance(this),
                        &MetadataEntry::method(LABELED, "label", "()Ljava/lang/String;"),
                        Dispatch::Virtual,
                        &[],
                    )?;
                    rt.set_field(
                        CallTarget::Instance(this),
                        &MetadataEntry::field(LABELED, "name", "Ljava/lang/String;"),
                        label,
                    )?;
                    Ok(ManagedValue::Void)
                }),
        )
        .unwrap();

    runtime
        .define_class(ClassBuilder::new(RUNNABLE).interface().abstract_method("run", "()V"))
        .unwrap();

    runtime
        .define_class(
            ClassBuilder::new(RUNNER).static_method("runIt", "(Ljava/lang/Runnable;)V", |rt, _, args| {
                let target = args[0]
                    .as_object()
                    .ok_or_else(|| BridgeError::managed("java.lang.NullPointerException", "runnable"))?;
                rt.call_method(
                    CallTarget::Instance(target),
                    &MetadataEntry::method(RUNNABLE, "run", "()V").as_interface(),
                    Dispatch::Virtual,
                    &[],
                )
            }),
        )
        .unwrap();
}

impl Fixture {
    /// A fresh wrapper bound to a new instance of `class`
    pub fn new_instance(&self, class: &str, args: ConstructorArgs) -> JsObjectId {
        let wrapper = self.engine.create_wrapper(class).unwrap();
        assert!(self
            .bridge
            .register_instance(wrapper, class, &args, None, false)
            .unwrap());
        wrapper
    }

    /// A fresh wrapper bound to an implementation subtype of `class`
    pub fn implement(&self, class: &str, implementation: JsObjectId, is_interface: bool) -> JsObjectId {
        let wrapper = self.engine.create_wrapper(class).unwrap();
        assert!(self
            .bridge
            .register_instance(wrapper, class, &ConstructorArgs::none(), Some(implementation), is_interface)
            .unwrap());
        wrapper
    }

    pub fn handle(&self, wrapper: JsObjectId) -> ObjectHandle {
        self.bridge.handle_of(&JsValue::Object(wrapper)).unwrap()
    }

    /// Call an instance method by name and signature
    pub fn call(&self, wrapper: JsObjectId, method: &str, signature: &str, args: &[JsValue]) -> BridgeResult<JsValue> {
        let entry = self.bridge.method_entry(WIDGET, method, signature)?;
        self.bridge.call_java_method(
            &JsValue::Object(wrapper),
            WIDGET,
            method,
            Some(&entry),
            false,
            false,
            args,
        )
    }
}
