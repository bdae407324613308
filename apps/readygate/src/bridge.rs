//! # Engine Bridge
//!
//! A stand-in for a natively hosted engine. Its operations are the calls a
//! front-end would make before the engine is up: load a profile, set prefs,
//! open windows. Every engine-bound operation is a handoff call; `dump_state`
//! reads the bridge in place and is therefore `Direct` and never queueable.
//!
//! ## Operations
//!
//! | Name | Params | Target | Kind |
//! |------|--------|--------|------|
//! | `load_profile` | `str` | instance | handoff |
//! | `set_pref` | `str, i64` | instance | handoff |
//! | `set_pref` | `str, bool` | instance | handoff |
//! | `set_pref` | `str, str` | instance | handoff |
//! | `open_window` | `str` (nullable) | instance | handoff |
//! | `dump_state` | - | instance | direct |
//! | `require_abi` | `i32` | static | handoff |

use parking_lot::Mutex;
use readygate_core::{
    ArgType, ArgValue, CallError, CallKind, ConfigurationError, DispatchTable, OperationDescriptor,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// ABI version `require_abi` accepts.
pub const BRIDGE_ABI: i32 = 3;

/// Engine state touched by bridge operations.
#[derive(Debug, Default)]
pub struct EngineBridge {
    profile: Mutex<Option<String>>,
    prefs: Mutex<BTreeMap<String, ArgValue>>,
    windows: Mutex<Vec<String>>,
}

/// Point-in-time copy of the bridge for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeSnapshot {
    pub profile: Option<String>,
    pub prefs: BTreeMap<String, ArgValue>,
    pub windows: Vec<String>,
}

impl EngineBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> BridgeSnapshot {
        BridgeSnapshot {
            profile: self.profile.lock().clone(),
            prefs: self.prefs.lock().clone(),
            windows: self.windows.lock().clone(),
        }
    }

    fn load_profile(&self, args: &[ArgValue]) -> Result<(), CallError> {
        let name = required_str(args, 0)?;
        let mut profile = self.profile.lock();
        if let Some(current) = profile.as_deref() {
            return Err(CallError::Failed(format!(
                "profile '{}' already loaded",
                current
            )));
        }
        *profile = Some(name.to_string());
        Ok(())
    }

    fn set_pref(&self, args: &[ArgValue]) -> Result<(), CallError> {
        if self.profile.lock().is_none() {
            return Err(CallError::Failed("no profile loaded".to_string()));
        }
        let key = required_str(args, 0)?;
        let value = args
            .get(1)
            .cloned()
            .ok_or_else(|| CallError::Failed("missing pref value".to_string()))?;
        self.prefs.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn open_window(&self, args: &[ArgValue]) -> Result<(), CallError> {
        let url = match args.first() {
            Some(arg) => arg.as_str(0)?.unwrap_or("about:blank"),
            None => "about:blank",
        };
        self.windows.lock().push(url.to_string());
        Ok(())
    }
}

fn required_str(args: &[ArgValue], index: usize) -> Result<&str, CallError> {
    args.get(index)
        .map(|arg| arg.as_str(index))
        .transpose()?
        .flatten()
        .ok_or_else(|| CallError::Failed(format!("argument {} must not be null", index)))
}

// =============================================================================
// DISPATCH TABLE
// =============================================================================

fn load_profile(bridge: &EngineBridge, args: &[ArgValue]) -> Result<(), CallError> {
    bridge.load_profile(args)
}

fn set_pref(bridge: &EngineBridge, args: &[ArgValue]) -> Result<(), CallError> {
    bridge.set_pref(args)
}

fn open_window(bridge: &EngineBridge, args: &[ArgValue]) -> Result<(), CallError> {
    bridge.open_window(args)
}

fn dump_state(bridge: &EngineBridge, _: &[ArgValue]) -> Result<(), CallError> {
    tracing::info!(snapshot = ?bridge.snapshot(), "engine state");
    Ok(())
}

fn require_abi(args: &[ArgValue]) -> Result<(), CallError> {
    let version = args
        .first()
        .ok_or_else(|| CallError::Failed("missing ABI version".to_string()))?
        .as_i32(0)?;
    if version != BRIDGE_ABI {
        return Err(CallError::Failed(format!(
            "engine ABI {} does not match bridge ABI {}",
            version, BRIDGE_ABI
        )));
    }
    Ok(())
}

const BRIDGE_OPERATIONS: [OperationDescriptor<EngineBridge>; 7] = [
    OperationDescriptor::instance(
        "load_profile",
        &[ArgType::Str],
        CallKind::Handoff,
        load_profile,
    ),
    OperationDescriptor::instance(
        "set_pref",
        &[ArgType::Str, ArgType::I64],
        CallKind::Handoff,
        set_pref,
    ),
    OperationDescriptor::instance(
        "set_pref",
        &[ArgType::Str, ArgType::Bool],
        CallKind::Handoff,
        set_pref,
    ),
    OperationDescriptor::instance(
        "set_pref",
        &[ArgType::Str, ArgType::Str],
        CallKind::Handoff,
        set_pref,
    ),
    OperationDescriptor::instance(
        "open_window",
        &[ArgType::Str],
        CallKind::Handoff,
        open_window,
    ),
    OperationDescriptor::instance("dump_state", &[], CallKind::Direct, dump_state),
    OperationDescriptor::static_fn("require_abi", &[ArgType::I32], CallKind::Handoff, require_abi),
];

/// Build the dispatch table for [`EngineBridge`].
pub fn dispatch_table() -> Result<DispatchTable<EngineBridge>, ConfigurationError> {
    let mut table = DispatchTable::new();
    for descriptor in BRIDGE_OPERATIONS {
        table.register(descriptor)?;
    }
    Ok(table)
}

/// One registered signature, as listed by `readygate operations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationInfo {
    pub name: &'static str,
    pub params: Vec<ArgType>,
    pub kind: CallKind,
    /// `instance` or `static`.
    pub target: &'static str,
}

/// List every signature in `table`, ordered by name then registration.
pub fn describe_operations(table: &DispatchTable<EngineBridge>) -> Vec<OperationInfo> {
    table
        .descriptors()
        .map(|d| OperationInfo {
            name: d.name(),
            params: d.params().to_vec(),
            kind: d.kind(),
            target: if d.is_instance() { "instance" } else { "static" },
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use readygate_core::{Arg, HandoffCall, Target};
    use std::sync::Arc;

    fn run(bridge: &Arc<EngineBridge>, name: &str, args: Vec<Arg>) -> Result<(), CallError> {
        let table = dispatch_table().expect("table");
        let target = Target::Instance(Arc::clone(bridge));
        table.resolve(&target, name, args).expect("resolve").call()
    }

    #[test]
    fn table_registers_every_operation() {
        let table = dispatch_table().expect("table");
        assert_eq!(table.len(), BRIDGE_OPERATIONS.len());
    }

    #[test]
    fn operations_listing_matches_table() {
        let table = dispatch_table().expect("table");
        let ops = describe_operations(&table);

        assert_eq!(ops.len(), BRIDGE_OPERATIONS.len());
        let overloads: Vec<_> = ops.iter().filter(|op| op.name == "set_pref").collect();
        assert_eq!(overloads.len(), 3);
        assert_eq!(overloads[1].params, vec![ArgType::Str, ArgType::Bool]);

        let dump = ops.iter().find(|op| op.name == "dump_state").expect("dump_state");
        assert_eq!(dump.kind, CallKind::Direct);
        assert!(dump.params.is_empty());

        let abi = ops.iter().find(|op| op.name == "require_abi").expect("require_abi");
        assert_eq!(abi.target, "static");
        assert_eq!(abi.kind, CallKind::Handoff);
    }

    #[test]
    fn prefs_require_profile() {
        let bridge = Arc::new(EngineBridge::new());

        let err = run(&bridge, "set_pref", vec![Arg::new("a"), Arg::new(1i64)])
            .expect_err("no profile");
        assert_eq!(err.to_string(), "no profile loaded");

        run(&bridge, "load_profile", vec![Arg::new("default")]).expect("load");
        run(&bridge, "set_pref", vec![Arg::new("a"), Arg::new(true)]).expect("set");

        let snapshot = bridge.snapshot();
        assert_eq!(snapshot.profile.as_deref(), Some("default"));
        assert_eq!(snapshot.prefs.get("a"), Some(&ArgValue::Bool(true)));
    }

    #[test]
    fn null_window_opens_blank() {
        let bridge = Arc::new(EngineBridge::new());
        run(&bridge, "open_window", vec![Arg::null(ArgType::Str)]).expect("open");
        assert_eq!(bridge.snapshot().windows, vec!["about:blank"]);
    }

    #[test]
    fn abi_check_is_static() {
        let table = dispatch_table().expect("table");
        let call = table
            .resolve(&Target::Static, "require_abi", vec![Arg::new(BRIDGE_ABI)])
            .expect("resolve");
        call.call().expect("abi");

        let call = table
            .resolve(&Target::Static, "require_abi", vec![Arg::new(1i32)])
            .expect("resolve");
        assert!(call.call().is_err());
    }
}
