//! The program trait.

use crate::{InvokeContext, ProgramAction, ProgramError};

/// An on-ledger program.
///
/// # Example
///
/// ```ignore
/// impl Program for GravityProgram {
///     fn name(&self) -> &'static str {
///         "gravity"
///     }
///
///     fn process(&self, ctx: &mut InvokeContext, data: &[u8]) -> Result<Vec<ProgramAction>, ProgramError> {
///         match GravityInstruction::decode(data)? {
///             GravityInstruction::Init { bft, init_round, consuls } => self.init(ctx, bft, init_round, consuls),
///             // ... etc
///         }
///     }
/// }
/// ```
pub trait Program: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Execute one instruction.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: never blocks or awaits
    /// - **Deterministic**: depends only on `ctx` and `data`
    /// - **No I/O**: nested invocations and events are requested through
    ///   the returned actions and run by the runtime after this call, in
    ///   order, inside the same transaction
    ///
    /// Account data changes made through `ctx` are kept only if the whole
    /// transaction succeeds.
    fn process(
        &self,
        ctx: &mut InvokeContext,
        data: &[u8],
    ) -> Result<Vec<ProgramAction>, ProgramError>;
}
