//! Recording fake scripting library
//!
//! Scripted outcomes for every primitive, and a log of the calls made, so
//! lifecycle ordering can be checked without a real VM.

use crate::abi::{LibraryError, OutputConsumer, OutputStatus, ScriptLibrary};
use std::cell::RefCell;
use std::rc::Rc;

/// One ABI call, as seen by [`FakeLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    CreateEngine,
    Compile,
    CompileLog,
    InstallOutput,
    Execute,
    ReleaseUnit,
    ReleaseEngine,
    Shutdown,
}

#[derive(Debug)]
pub struct FakeEngine;

pub struct FakeUnit<'e> {
    _engine: &'e FakeEngine,
    consumer: Option<Rc<dyn OutputConsumer>>,
}

/// Succeeds at everything unless told otherwise.
#[derive(Default)]
pub struct FakeLibrary {
    engine: Option<LibraryError>,
    compile: Option<LibraryError>,
    compile_log: Option<Vec<u8>>,
    install: Option<LibraryError>,
    execute: Option<LibraryError>,
    output: Vec<Vec<u8>>,
    calls: RefCell<Vec<Call>>,
    sources: RefCell<Vec<String>>,
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_engine(mut self, error: LibraryError) -> Self {
        self.engine = Some(error);
        self
    }

    pub fn failing_compile(mut self, error: LibraryError) -> Self {
        self.compile = Some(error);
        self
    }

    pub fn with_compile_log(mut self, log: Vec<u8>) -> Self {
        self.compile_log = Some(log);
        self
    }

    pub fn failing_install(mut self, error: LibraryError) -> Self {
        self.install = Some(error);
        self
    }

    pub fn failing_execute(mut self, error: LibraryError) -> Self {
        self.execute = Some(error);
        self
    }

    /// Chunks the program "prints" when executed, in order.
    pub fn with_output<I, B>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        self.output = chunks.into_iter().map(|c| c.as_ref().to_vec()).collect();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn compiled_sources(&self) -> Vec<String> {
        self.sources.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn outcome(error: &Option<LibraryError>) -> Result<(), LibraryError> {
        match error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl ScriptLibrary for FakeLibrary {
    type Engine = FakeEngine;
    type Unit<'e>
        = FakeUnit<'e>
    where
        Self: 'e;

    fn create_engine(&self) -> Result<FakeEngine, LibraryError> {
        self.record(Call::CreateEngine);
        Self::outcome(&self.engine).map(|()| FakeEngine)
    }

    fn compile<'e>(
        &'e self,
        engine: &'e FakeEngine,
        source: &str,
    ) -> Result<FakeUnit<'e>, LibraryError> {
        self.record(Call::Compile);
        self.sources.borrow_mut().push(source.to_string());
        Self::outcome(&self.compile).map(|()| FakeUnit {
            _engine: engine,
            consumer: None,
        })
    }

    fn compile_log(&self, _engine: &FakeEngine) -> Option<Vec<u8>> {
        self.record(Call::CompileLog);
        self.compile_log.clone()
    }

    fn install_output<'e>(
        &'e self,
        unit: &mut FakeUnit<'e>,
        consumer: Rc<dyn OutputConsumer>,
    ) -> Result<(), LibraryError> {
        self.record(Call::InstallOutput);
        Self::outcome(&self.install)?;
        unit.consumer = Some(consumer);
        Ok(())
    }

    fn execute<'e>(&'e self, unit: &mut FakeUnit<'e>) -> Result<(), LibraryError> {
        self.record(Call::Execute);
        if let Some(consumer) = &unit.consumer {
            for chunk in &self.output {
                if consumer.consume(chunk) == OutputStatus::Abort {
                    return Err(LibraryError::other("output consumer aborted"));
                }
            }
        }
        Self::outcome(&self.execute)
    }

    fn release_unit<'e>(&'e self, _unit: FakeUnit<'e>) {
        self.record(Call::ReleaseUnit);
    }

    fn release_engine(&self, _engine: FakeEngine) {
        self.record(Call::ReleaseEngine);
    }

    fn shutdown(&self) {
        self.record(Call::Shutdown);
    }
}
