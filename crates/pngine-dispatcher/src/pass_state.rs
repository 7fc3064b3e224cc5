use crate::errors::DispatchError;

/// The dispatcher's pass state machine (spec §4.8): `Idle -> InRenderPass |
/// InComputePass -> Idle`. This is the only bookkeeping the dispatcher does
/// beyond what `Module` and the GPU back-end already track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    InRenderPass,
    InComputePass,
}

impl PassState {
    pub fn begin_render(&mut self) -> Result<(), DispatchError> {
        if *self != PassState::Idle {
            return Err(DispatchError::PassStateViolation("begin_render_pass while a pass is already active"));
        }
        tracing::debug!(from = ?*self, to = ?PassState::InRenderPass, "pass state transition");
        *self = PassState::InRenderPass;
        Ok(())
    }

    pub fn begin_compute(&mut self) -> Result<(), DispatchError> {
        if *self != PassState::Idle {
            return Err(DispatchError::PassStateViolation("begin_compute_pass while a pass is already active"));
        }
        tracing::debug!(from = ?*self, to = ?PassState::InComputePass, "pass state transition");
        *self = PassState::InComputePass;
        Ok(())
    }

    pub fn end(&mut self) -> Result<(), DispatchError> {
        if *self == PassState::Idle {
            return Err(DispatchError::PassStateViolation("end_pass with no active pass"));
        }
        tracing::debug!(from = ?*self, to = ?PassState::Idle, "pass state transition");
        *self = PassState::Idle;
        Ok(())
    }

    pub fn require_any_pass(&self, op: &'static str) -> Result<(), DispatchError> {
        if *self == PassState::Idle {
            return Err(DispatchError::PassStateViolation(op));
        }
        Ok(())
    }

    pub fn require_render_pass(&self, op: &'static str) -> Result<(), DispatchError> {
        if *self != PassState::InRenderPass {
            return Err(DispatchError::PassStateViolation(op));
        }
        Ok(())
    }

    pub fn require_compute_pass(&self, op: &'static str) -> Result<(), DispatchError> {
        if *self != PassState::InComputePass {
            return Err(DispatchError::PassStateViolation(op));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_begin_end_round_trips_to_idle() {
        let mut s = PassState::Idle;
        s.begin_render().unwrap();
        s.require_render_pass("draw").unwrap();
        s.end().unwrap();
        assert_eq!(s, PassState::Idle);
    }

    #[test]
    fn double_begin_is_a_violation() {
        let mut s = PassState::Idle;
        s.begin_compute().unwrap();
        assert!(s.begin_render().is_err());
    }

    #[test]
    fn end_without_begin_is_a_violation() {
        let mut s = PassState::Idle;
        assert!(s.end().is_err());
    }
}
