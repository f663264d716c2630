use super::id::ActorRef;

/// Who is acting and from where, for the duration of one logical operation
/// (one request, one job run). Threaded explicitly into the capture calls
/// where possible; [`scope`] covers hosts that cannot pass it through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationContext {
    pub actor: Option<ActorRef>,
    pub origin: Option<String>,
}

impl OperationContext {
    pub fn new(actor: ActorRef) -> Self {
        Self {
            actor: Some(actor),
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

tokio::task_local! {
    static CURRENT: OperationContext;
}

/// Run `fut` with `ctx` installed as the task's operation context.
///
/// The context lives exactly as long as the future: it is dropped on normal
/// completion, early return, and panic alike, and is never visible to sibling
/// tasks. There is deliberately no process-global setter.
pub async fn scope<F>(ctx: OperationContext, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(ctx, fut).await
}

/// Snapshot of the current task's operation context, if one is installed.
pub fn current() -> Option<OperationContext> {
    CURRENT.try_with(Clone::clone).ok()
}
