use async_trait::async_trait;

use trueform_types::{Feature, Selector};

use crate::options::{MeshOptions, StepOptions, StlOptions};
use crate::types::{
    BackendError, Capabilities, KernelObject, KernelResult, KernelSelection, MeshData,
    ResolveError,
};

/// Resolves a selector against the upstream aggregate. The compile engine
/// supplies the implementation; backends call it for the selector-typed
/// fields of the feature they are executing.
pub trait SelectorResolver: Sync {
    fn resolve(
        &self,
        selector: &Selector,
        upstream: &KernelResult,
    ) -> Result<Vec<KernelSelection>, ResolveError>;

    /// Resolve and require exactly one selection.
    fn resolve_one(
        &self,
        selector: &Selector,
        upstream: &KernelResult,
    ) -> Result<KernelSelection, ResolveError> {
        let mut matches = self.resolve(selector, upstream)?;
        match matches.len() {
            0 => Err(ResolveError::NoMatch),
            1 => Ok(matches.remove(0)),
            n => Err(ResolveError::Ambiguous { count: n }),
        }
    }
}

/// Everything a backend needs to execute one feature step.
pub struct ExecuteRequest<'a> {
    pub feature: &'a Feature,
    /// Merged result of all previously executed features. The backend must
    /// never mutate it (enforced by the shared borrow).
    pub upstream: &'a KernelResult,
    pub resolve: &'a dyn SelectorResolver,
}

/// The geometry kernel contract the executor drives. Implementations own
/// all geometric algorithms; the core owns ordering, resolution, and
/// result merging.
pub trait Backend {
    fn execute(&mut self, req: ExecuteRequest<'_>) -> Result<KernelResult, BackendError>;

    fn mesh(&mut self, target: &KernelObject, opts: &MeshOptions) -> Result<MeshData, BackendError>;

    fn export_step(
        &mut self,
        target: &KernelObject,
        opts: &StepOptions,
    ) -> Result<Vec<u8>, BackendError>;

    fn export_stl(
        &mut self,
        _target: &KernelObject,
        _opts: &StlOptions,
    ) -> Result<Vec<u8>, BackendError> {
        Err(BackendError::NotSupported {
            operation: "exportStl".to_string(),
        })
    }

    fn check_valid(&mut self, _target: &KernelObject) -> Result<bool, BackendError> {
        Ok(true)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}

/// Async variant of [`Backend`]. Identical semantics; suspension happens
/// only at these call boundaries.
#[async_trait]
pub trait AsyncBackend: Send {
    async fn execute(&mut self, req: ExecuteRequest<'_>) -> Result<KernelResult, BackendError>;

    async fn mesh(
        &mut self,
        target: &KernelObject,
        opts: &MeshOptions,
    ) -> Result<MeshData, BackendError>;

    async fn export_step(
        &mut self,
        target: &KernelObject,
        opts: &StepOptions,
    ) -> Result<Vec<u8>, BackendError>;

    async fn export_stl(
        &mut self,
        _target: &KernelObject,
        _opts: &StlOptions,
    ) -> Result<Vec<u8>, BackendError> {
        Err(BackendError::NotSupported {
            operation: "exportStl".to_string(),
        })
    }

    async fn check_valid(&mut self, _target: &KernelObject) -> Result<bool, BackendError> {
        Ok(true)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}

/// Adapter running any sync backend behind the async contract.
pub struct BlockingBackend<B: Backend>(pub B);

#[async_trait]
impl<B: Backend + Send> AsyncBackend for BlockingBackend<B> {
    async fn execute(&mut self, req: ExecuteRequest<'_>) -> Result<KernelResult, BackendError> {
        self.0.execute(req)
    }

    async fn mesh(
        &mut self,
        target: &KernelObject,
        opts: &MeshOptions,
    ) -> Result<MeshData, BackendError> {
        self.0.mesh(target, opts)
    }

    async fn export_step(
        &mut self,
        target: &KernelObject,
        opts: &StepOptions,
    ) -> Result<Vec<u8>, BackendError> {
        self.0.export_step(target, opts)
    }

    async fn export_stl(
        &mut self,
        target: &KernelObject,
        opts: &StlOptions,
    ) -> Result<Vec<u8>, BackendError> {
        self.0.export_stl(target, opts)
    }

    async fn check_valid(&mut self, target: &KernelObject) -> Result<bool, BackendError> {
        self.0.check_valid(target)
    }

    fn capabilities(&self) -> Capabilities {
        self.0.capabilities()
    }
}
