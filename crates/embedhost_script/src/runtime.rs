//! QuickJS script library
//!
//! The engine is a QuickJS runtime with one full context. A compiled unit is
//! the program wrapped as a function body (`Function(source)`), kept alive as
//! a persistent handle until the unit is released.
//!
//! Globals available to programs:
//! - `echo(value)` - program output, `value` converted to a string, installed
//!   by [`ScriptLibrary::install_output`]
//! - `EOL` - line terminator
//! - `uname()` - host OS and architecture

use crate::abi::{LibraryError, OutputConsumer, OutputStatus, ScriptLibrary};
use rquickjs::convert::Coerced;
use rquickjs::{Context, Ctx, Function, Persistent, Runtime};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Resource limits applied to every engine the library creates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineLimits {
    pub memory_limit: Option<usize>,
    pub max_stack_size: Option<usize>,
}

/// QuickJS behind the [`ScriptLibrary`] interface.
#[derive(Debug, Default)]
pub struct QuickJs {
    limits: EngineLimits,
}

impl QuickJs {
    pub fn new(limits: EngineLimits) -> Self {
        Self { limits }
    }
}

pub struct QuickJsEngine {
    // Declared before `runtime` so the context drops first
    context: Context,
    runtime: Runtime,
    compile_log: RefCell<Option<String>>,
}

pub struct QuickJsUnit<'e> {
    engine: &'e QuickJsEngine,
    main: Persistent<Function<'static>>,
    aborted: Rc<Cell<bool>>,
}

enum Failure {
    Thrown(Thrown),
    Library(String),
}

/// A caught JS exception.
struct Thrown {
    name: Option<String>,
    text: String,
}

impl Thrown {
    /// Errors the parser reports about the program text itself. Anything
    /// else thrown while compiling (out of memory, stack overflow) is not a
    /// diagnostic.
    fn is_diagnostic(&self) -> bool {
        matches!(self.name.as_deref(), Some("SyntaxError" | "ReferenceError"))
    }
}

impl ScriptLibrary for QuickJs {
    type Engine = QuickJsEngine;
    type Unit<'e>
        = QuickJsUnit<'e>
    where
        Self: 'e;

    fn create_engine(&self) -> Result<QuickJsEngine, LibraryError> {
        let runtime = Runtime::new().map_err(library_error)?;
        if let Some(limit) = self.limits.memory_limit {
            runtime.set_memory_limit(limit);
        }
        if let Some(limit) = self.limits.max_stack_size {
            runtime.set_max_stack_size(limit);
        }

        let context = Context::full(&runtime).map_err(library_error)?;
        context
            .with(|ctx| install_builtins(&ctx))
            .map_err(library_error)?;

        Ok(QuickJsEngine {
            context,
            runtime,
            compile_log: RefCell::new(None),
        })
    }

    fn compile<'e>(
        &'e self,
        engine: &'e QuickJsEngine,
        source: &str,
    ) -> Result<QuickJsUnit<'e>, LibraryError> {
        *engine.compile_log.borrow_mut() = None;

        let compiled = engine.context.with(|ctx| match compile_function(&ctx, source) {
            Ok(main) => Ok(Persistent::save(&ctx, main)),
            Err(rquickjs::Error::Exception) => Err(Failure::Thrown(catch_exception(&ctx))),
            Err(err) => Err(Failure::Library(err.to_string())),
        });

        match compiled {
            Ok(main) => Ok(QuickJsUnit {
                engine,
                main,
                aborted: Rc::new(Cell::new(false)),
            }),
            Err(Failure::Thrown(thrown)) if thrown.is_diagnostic() => {
                tracing::debug!(log = %thrown.text, "QuickJS rejected program");
                *engine.compile_log.borrow_mut() = Some(thrown.text);
                Err(LibraryError::Compile)
            }
            Err(Failure::Thrown(thrown)) => Err(LibraryError::Other(thrown.text)),
            Err(Failure::Library(message)) => Err(LibraryError::Other(message)),
        }
    }

    fn compile_log(&self, engine: &QuickJsEngine) -> Option<Vec<u8>> {
        engine
            .compile_log
            .borrow()
            .as_ref()
            .map(|log| log.clone().into_bytes())
    }

    fn install_output<'e>(
        &'e self,
        unit: &mut QuickJsUnit<'e>,
        consumer: Rc<dyn OutputConsumer>,
    ) -> Result<(), LibraryError> {
        let aborted = Rc::clone(&unit.aborted);
        unit.engine
            .context
            .with(|ctx| {
                let echo = Function::new(ctx.clone(), move |text: Coerced<String>| {
                    if aborted.get() {
                        return;
                    }
                    if consumer.consume(text.0.as_bytes()) == OutputStatus::Abort {
                        aborted.set(true);
                    }
                })?;
                ctx.globals().set("echo", echo)
            })
            .map_err(library_error)
    }

    fn execute<'e>(&'e self, unit: &mut QuickJsUnit<'e>) -> Result<(), LibraryError> {
        let engine = unit.engine;
        let main = unit.main.clone();

        engine
            .context
            .with(|ctx| match main.restore(&ctx).and_then(|f| f.call::<_, ()>(())) {
                Ok(()) => Ok(()),
                Err(rquickjs::Error::Exception) => {
                    Err(LibraryError::Other(catch_exception(&ctx).text))
                }
                Err(err) => Err(library_error(err)),
            })?;

        while engine.runtime.is_job_pending() {
            engine
                .runtime
                .execute_pending_job()
                .map_err(|err| job_failure(&err.0))?;
        }

        if unit.aborted.get() {
            return Err(LibraryError::other("output consumer aborted"));
        }
        Ok(())
    }

    fn release_unit<'e>(&'e self, unit: QuickJsUnit<'e>) {
        drop(unit);
    }

    fn release_engine(&self, engine: QuickJsEngine) {
        drop(engine);
    }

    fn shutdown(&self) {
        tracing::debug!("QuickJS keeps no process-wide state, nothing to shut down");
    }
}

fn install_builtins(ctx: &Ctx<'_>) -> rquickjs::Result<()> {
    let globals = ctx.globals();
    globals.set("EOL", "\n")?;
    globals.set("uname", Function::new(ctx.clone(), || host_uname())?)?;
    Ok(())
}

fn compile_function<'js>(ctx: &Ctx<'js>, source: &str) -> rquickjs::Result<Function<'js>> {
    let constructor: Function = ctx.globals().get("Function")?;
    constructor.call((source,))
}

/// Takes the pending exception off the context.
fn catch_exception(ctx: &Ctx<'_>) -> Thrown {
    let thrown = ctx.catch();

    if let Some(object) = thrown.as_object() {
        let field = |key: &str| object.get::<_, Option<String>>(key).ok().flatten();
        let name = field("name");
        let mut text = match (name.clone(), field("message")) {
            (Some(name), Some(message)) => format!("{name}: {message}"),
            (Some(name), None) => name,
            (None, Some(message)) => message,
            (None, None) => "uncaught exception".to_string(),
        };
        if let Some(stack) = field("stack").filter(|s| !s.trim().is_empty()) {
            text.push('\n');
            text.push_str(stack.trim_end());
        }
        return Thrown { name, text };
    }

    let text = thrown
        .as_string()
        .and_then(|s| s.to_string().ok())
        .unwrap_or_else(|| "uncaught exception".to_string());
    Thrown { name: None, text }
}

/// A pending job failed; its exception is still pending on `context`.
fn job_failure(context: &Context) -> LibraryError {
    let thrown = context.with(|ctx| catch_exception(&ctx));
    LibraryError::Other(thrown.text)
}

fn library_error(err: rquickjs::Error) -> LibraryError {
    LibraryError::Other(err.to_string())
}

pub fn host_uname() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}
