//! Embedded program lifecycle
//!
//! Create engine → compile → install output sink → execute → release unit →
//! release engine. Every handle acquired is released on every path, the unit
//! always before its engine.

use crate::abi::{LibraryError, ScriptLibrary};
use crate::channel::DiagnosticChannel;
use crate::error::EmbedError;
use crate::fatal::fatal;
use crate::output::OutputSinkAdapter;
use crate::program::Program;
use std::rc::Rc;

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub output_events: usize,
    pub output_bytes: usize,
}

/// Runs `program` once on a fresh engine, forwarding its output to `channel`.
///
/// Fatal errors have already gone through [`fatal`] (message written, library
/// shut down) when this returns. [`EmbedError::Execution`] is returned as is
/// and left to the caller.
pub fn run_embedded_program<L: ScriptLibrary>(
    library: &L,
    channel: Rc<dyn DiagnosticChannel>,
    program: &Program,
) -> Result<RunReport, EmbedError> {
    let result = run_on_new_engine(library, &channel, program);

    match &result {
        Ok(report) => tracing::info!(
            program = program.name,
            events = report.output_events,
            bytes = report.output_bytes,
            "embedded program finished"
        ),
        Err(error) if error.is_fatal() => fatal(library, channel.as_ref(), error),
        Err(error) => tracing::warn!(program = program.name, "embedded program failed: {error}"),
    }

    result
}

fn run_on_new_engine<L: ScriptLibrary>(
    library: &L,
    channel: &Rc<dyn DiagnosticChannel>,
    program: &Program,
) -> Result<RunReport, EmbedError> {
    let engine = library
        .create_engine()
        .map_err(|source| EmbedError::EngineAllocation { source })?;
    tracing::debug!(program = program.name, "engine instance created");

    let outcome = compile_and_run(library, &engine, channel, program);

    library.release_engine(engine);
    tracing::debug!("engine instance released");
    outcome
}

fn compile_and_run<'e, L: ScriptLibrary>(
    library: &'e L,
    engine: &'e L::Engine,
    channel: &Rc<dyn DiagnosticChannel>,
    program: &Program,
) -> Result<RunReport, EmbedError> {
    let mut unit = match library.compile(engine, program.source) {
        Ok(unit) => unit,
        Err(LibraryError::Compile) => {
            let log = library.compile_log(engine).filter(|log| !log.is_empty());
            if let Some(log) = &log {
                channel.write(log);
                channel.write(b"\n");
            }
            return Err(EmbedError::Compile { log });
        }
        Err(source) => return Err(EmbedError::OtherCompile { source }),
    };
    tracing::debug!(
        program = program.name,
        len = program.source.len(),
        "program compiled"
    );

    let outcome = install_and_execute(library, &mut unit, channel);

    library.release_unit(unit);
    tracing::debug!("compiled unit released");
    outcome
}

fn install_and_execute<'e, L: ScriptLibrary>(
    library: &'e L,
    unit: &mut L::Unit<'e>,
    channel: &Rc<dyn DiagnosticChannel>,
) -> Result<RunReport, EmbedError> {
    let adapter = Rc::new(OutputSinkAdapter::new(Rc::clone(channel)));

    library
        .install_output(unit, adapter.clone())
        .map_err(|source| EmbedError::OutputConfig { source })?;
    tracing::debug!("output consumer installed");

    library
        .execute(unit)
        .map_err(|source| EmbedError::Execution { source })?;

    Ok(RunReport {
        output_events: adapter.events(),
        output_bytes: adapter.bytes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;
    use crate::program::EMBEDDED_PROGRAM;
    use crate::testing::{Call, FakeLibrary};

    fn run(library: &FakeLibrary) -> (Result<RunReport, EmbedError>, Rc<MemoryChannel>) {
        let channel = Rc::new(MemoryChannel::new());
        let result = run_embedded_program(library, channel.clone(), &EMBEDDED_PROGRAM);
        (result, channel)
    }

    #[test]
    fn happy_path_forwards_output_and_releases_in_order() {
        let library = FakeLibrary::new().with_output(["Welcome\n", "time\n", "uname"]);

        let (result, channel) = run(&library);

        assert_eq!(
            result,
            Ok(RunReport {
                output_events: 3,
                output_bytes: 18
            })
        );
        assert_eq!(
            channel.writes(),
            vec![b"Welcome\n".to_vec(), b"time\n".to_vec(), b"uname".to_vec()]
        );
        assert_eq!(
            library.calls(),
            vec![
                Call::CreateEngine,
                Call::Compile,
                Call::InstallOutput,
                Call::Execute,
                Call::ReleaseUnit,
                Call::ReleaseEngine,
            ]
        );
        assert_eq!(library.compiled_sources(), vec![EMBEDDED_PROGRAM.source.to_string()]);
    }

    #[test]
    fn allocation_failure_skips_everything_else() {
        let library = FakeLibrary::new().failing_engine(LibraryError::other("out of memory"));

        let (result, channel) = run(&library);

        assert!(matches!(result, Err(EmbedError::EngineAllocation { .. })));
        assert_eq!(library.calls(), vec![Call::CreateEngine, Call::Shutdown]);
        assert_eq!(
            channel.contents_lossy(),
            "Error while allocating a new script engine instance\n"
        );
    }

    #[test]
    fn compile_error_forwards_log_before_fatal_message() {
        let log = b"SyntaxError: unexpected token in expression: ')'".to_vec();
        let library = FakeLibrary::new()
            .failing_compile(LibraryError::Compile)
            .with_compile_log(log.clone());

        let (result, channel) = run(&library);

        assert_eq!(result, Err(EmbedError::Compile { log: Some(log.clone()) }));
        assert_eq!(
            channel.writes(),
            vec![log, b"\n".to_vec(), b"Compile error".to_vec(), b"\n".to_vec()]
        );
        assert_eq!(
            library.calls(),
            vec![
                Call::CreateEngine,
                Call::Compile,
                Call::CompileLog,
                Call::ReleaseEngine,
                Call::Shutdown,
            ]
        );
    }

    #[test]
    fn compile_error_with_empty_log_forwards_nothing() {
        let library = FakeLibrary::new()
            .failing_compile(LibraryError::Compile)
            .with_compile_log(Vec::new());

        let (result, channel) = run(&library);

        assert_eq!(result, Err(EmbedError::Compile { log: None }));
        assert_eq!(channel.contents_lossy(), "Compile error\n");
        assert!(library.calls().contains(&Call::Shutdown));
    }

    #[test]
    fn compile_error_without_log_forwards_nothing() {
        let library = FakeLibrary::new().failing_compile(LibraryError::Compile);

        let (result, channel) = run(&library);

        assert_eq!(result, Err(EmbedError::Compile { log: None }));
        assert_eq!(channel.writes(), vec![b"Compile error".to_vec(), b"\n".to_vec()]);
    }

    #[test]
    fn other_compile_failure_does_not_read_log() {
        let library = FakeLibrary::new()
            .failing_compile(LibraryError::other("unsupported flags"))
            .with_compile_log(b"stale log".to_vec());

        let (result, channel) = run(&library);

        assert!(matches!(result, Err(EmbedError::OtherCompile { .. })));
        assert!(!library.calls().contains(&Call::CompileLog));
        assert_eq!(channel.contents_lossy(), "Compile error\n");
    }

    #[test]
    fn rejected_output_config_never_executes() {
        let library = FakeLibrary::new()
            .failing_install(LibraryError::other("rejected"))
            .with_output(["never seen"]);

        let (result, channel) = run(&library);

        assert!(matches!(result, Err(EmbedError::OutputConfig { .. })));
        assert!(!library.calls().contains(&Call::Execute));
        assert_eq!(
            library.calls(),
            vec![
                Call::CreateEngine,
                Call::Compile,
                Call::InstallOutput,
                Call::ReleaseUnit,
                Call::ReleaseEngine,
                Call::Shutdown,
            ]
        );
        assert_eq!(
            channel.contents_lossy(),
            "Error while installing the VM output consumer callback\n"
        );
    }

    #[test]
    fn execution_failure_is_returned_without_fatal_path() {
        let library = FakeLibrary::new()
            .with_output(["partial"])
            .failing_execute(LibraryError::other("ReferenceError: x is not defined"));

        let (result, channel) = run(&library);

        assert!(matches!(result, Err(EmbedError::Execution { .. })));
        assert_eq!(channel.contents_lossy(), "partial");
        assert!(!library.calls().contains(&Call::Shutdown));
        assert_eq!(
            &library.calls()[3..],
            &[Call::Execute, Call::ReleaseUnit, Call::ReleaseEngine]
        );
    }

    #[test]
    fn each_handle_released_exactly_once() {
        let library = FakeLibrary::new().with_output(["x"]);
        let _ = run(&library);

        let calls = library.calls();
        let count = |call: Call| calls.iter().filter(|c| **c == call).count();
        assert_eq!(count(Call::ReleaseUnit), 1);
        assert_eq!(count(Call::ReleaseEngine), 1);
    }
}
