//! Action descriptors and typed argument binding.
//!
//! An [`Action`] is built once at registration time from a plain Rust
//! function and a list of argument names. The function's parameter types
//! become the descriptor's argument kinds; at request time the invoker binds
//! each argument by name through the [`Binders`](meridian_extract::Binders)
//! registry and hands the values back to the function in order.
//!
//! ```
//! use meridian_core::outcome::Text;
//! use meridian_middleware::{Action, Controller};
//!
//! fn show(_c: &mut Controller, id: u64, verbose: Option<bool>) -> Text {
//!     Text::new(format!("user {id} verbose={verbose:?}"))
//! }
//!
//! let action = Action::new("Users.show", &["id", "verbose"], show).unwrap();
//! assert_eq!(action.args().len(), 2);
//! assert_eq!(action.args()[0].name(), "id");
//! ```
//!
//! A trailing `Vec<T>` argument collects every value under its name, which
//! covers handlers that take a variable number of values.

use std::any::type_name;
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use meridian_core::{contract_violation, BoxOutcome, IntoOutcome};
use meridian_extract::{BoundValue, TypeTag, Upload};
use meridian_ws::WebSocket;

use crate::controller::Controller;
use crate::error::ActionError;

/// How the invoker obtains an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// The request's upgraded WebSocket, passed through unchanged.
    Socket,
    /// A parameter bound by name as the tagged type.
    Value(TypeTag),
}

/// A declared action argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    name: String,
    kind: ArgKind,
}

impl ArgSpec {
    /// Creates an argument spec.
    pub fn new(name: impl Into<String>, kind: ArgKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Returns the parameter name the argument binds from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the argument kind.
    pub fn kind(&self) -> ArgKind {
        self.kind
    }
}

/// A type that can appear as an action argument.
///
/// Value arguments must have a binder registered for them. Custom types
/// opt in with an empty impl after registering their binder.
pub trait ActionArg: Sized + Send + 'static {
    /// Returns how the invoker obtains this argument.
    fn kind() -> ArgKind {
        ArgKind::Value(TypeTag::of::<Self>())
    }
}

macro_rules! value_args {
    ($($ty:ty),* $(,)?) => {
        $(impl ActionArg for $ty {})*
    };
}

value_args!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
    String, Upload, Bytes, PathBuf,
);

impl<T: ActionArg> ActionArg for Vec<T> {}

impl<T: ActionArg> ActionArg for Option<T> {}

impl ActionArg for WebSocket {
    fn kind() -> ArgKind {
        ArgKind::Socket
    }
}

/// Bound argument values in declaration order.
pub struct ActionArgs {
    values: VecDeque<BoundValue>,
}

impl ActionArgs {
    /// Wraps already bound values.
    pub fn new(values: impl IntoIterator<Item = BoundValue>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Takes the next argument as `T`.
    ///
    /// Raises a contract violation when the arguments run out or the next
    /// value has a different type.
    pub fn take<T: 'static>(&mut self) -> T {
        let Some(value) = self.values.pop_front() else {
            contract_violation(format!("missing action argument of type {}", type_name::<T>()))
        };
        match value.downcast::<T>() {
            Ok(value) => *value,
            Err(_) => contract_violation(format!(
                "action argument is not of type {}",
                type_name::<T>()
            )),
        }
    }

    /// Returns the number of arguments not yet taken.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if every argument has been taken.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for ActionArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionArgs")
            .field("len", &self.values.len())
            .finish()
    }
}

/// A function usable as an action.
///
/// Implemented for functions taking `&mut Controller` followed by up to
/// eight [`ActionArg`] parameters and returning anything that implements
/// [`IntoOutcome`].
pub trait Handler<Args>: Send + Sync + 'static {
    /// Returns the kind of each argument after the controller.
    fn arg_kinds() -> Vec<ArgKind>;

    /// Calls the function with bound arguments.
    fn call(&self, c: &mut Controller, args: ActionArgs) -> Option<BoxOutcome>;
}

macro_rules! impl_handler {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> Handler<($($arg,)*)> for F
        where
            F: Fn(&mut Controller, $($arg),*) -> R + Send + Sync + 'static,
            R: IntoOutcome,
            $($arg: ActionArg,)*
        {
            fn arg_kinds() -> Vec<ArgKind> {
                vec![$($arg::kind()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, c: &mut Controller, mut args: ActionArgs) -> Option<BoxOutcome> {
                $(let $arg = args.take::<$arg>();)*
                self(c, $($arg),*).into_outcome()
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);

type ErasedHandler = dyn Fn(&mut Controller, ActionArgs) -> Option<BoxOutcome> + Send + Sync;

/// A registered action: its name, declared arguments and handler.
#[derive(Clone)]
pub struct Action {
    name: String,
    args: Vec<ArgSpec>,
    handler: Arc<ErasedHandler>,
}

impl Action {
    /// Describes `handler` as an action whose arguments bind from
    /// `arg_names`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::ArityMismatch`] if the number of names does not
    /// match the handler's parameters.
    pub fn new<H, Args>(
        name: impl Into<String>,
        arg_names: &[&str],
        handler: H,
    ) -> Result<Self, ActionError>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        let name = name.into();
        let kinds = H::arg_kinds();
        if kinds.len() != arg_names.len() {
            return Err(ActionError::ArityMismatch {
                action: name,
                declared: arg_names.len(),
                expected: kinds.len(),
            });
        }

        let args = arg_names
            .iter()
            .zip(kinds)
            .map(|(arg, kind)| ArgSpec::new(*arg, kind))
            .collect();

        let erased = move |c: &mut Controller, args: ActionArgs| {
            <H as Handler<Args>>::call(&handler, c, args)
        };
        Ok(Self {
            name,
            args,
            handler: Arc::new(erased),
        })
    }

    /// Returns the action name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared arguments.
    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    /// Returns true if any argument takes the upgraded socket.
    pub fn takes_socket(&self) -> bool {
        self.args.iter().any(|arg| arg.kind == ArgKind::Socket)
    }

    /// Binds every argument and calls the handler.
    ///
    /// Returns the handler's outcome, or `None` when it produced none.
    pub fn invoke(&self, c: &mut Controller) -> Option<BoxOutcome> {
        let mut values: Vec<BoundValue> = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            let value: BoundValue = match arg.kind {
                ArgKind::Socket => match c.take_websocket() {
                    Some(ws) => Box::new(ws),
                    None => contract_violation(format!(
                        "action {} declares socket argument `{}` but the request was not upgraded",
                        self.name, arg.name
                    )),
                },
                ArgKind::Value(tag) => c.params_mut().bind_value(&arg.name, tag),
            };
            values.push(value);
        }
        (self.handler)(c, ActionArgs::new(values))
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
