// Remote Executor Port
// Delegates a whole experiment to a host reachable by secure shell

use crate::domain::{ExecContext, ExperimentRequest, Response};
use async_trait::async_trait;

/// Remote Executor trait
///
/// Implementations repeat the create/destroy contract on the remote host and
/// own the liveness verification for anything they launch there.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(&self, ctx: &ExecContext, request: &ExperimentRequest) -> Response;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock Remote Executor returning a canned response
    pub struct MockRemoteExecutor {
        response: Response,
        requests: Arc<Mutex<Vec<ExperimentRequest>>>,
    }
    impl MockRemoteExecutor {
        pub fn new(response: Response) -> Self {
            Self {
                response,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }
        pub fn requests(&self) -> Vec<ExperimentRequest> {
            self.requests.lock().unwrap().clone()
        }
    }
    #[async_trait]
    impl RemoteExecutor for MockRemoteExecutor {
        async fn execute(&self, _ctx: &ExecContext, request: &ExperimentRequest) -> Response {
            self.requests.lock().unwrap().push(request.clone());
            self.response.clone()
        }
    }
}
