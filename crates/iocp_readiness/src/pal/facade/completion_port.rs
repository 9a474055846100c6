// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use crate::DrainMode;
use crate::pal::{Completion, CompletionPort, CompletionPortImpl, CompletionPosterFacade};
#[cfg(test)]
use crate::testing::SimulatedCompletionPort;

#[derive(Debug)]
pub enum CompletionPortFacade {
    Real(CompletionPortImpl),

    #[cfg(test)]
    Simulated(SimulatedCompletionPort),
}

impl CompletionPortFacade {
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    pub(crate) const fn from_real(real: CompletionPortImpl) -> Self {
        Self::Real(real)
    }

    #[cfg(test)]
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    pub(crate) const fn from_simulated(simulated: SimulatedCompletionPort) -> Self {
        Self::Simulated(simulated)
    }
}

impl From<CompletionPortImpl> for CompletionPortFacade {
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn from(real: CompletionPortImpl) -> Self {
        Self::from_real(real)
    }
}

#[cfg(test)]
impl From<SimulatedCompletionPort> for CompletionPortFacade {
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn from(simulated: SimulatedCompletionPort) -> Self {
        Self::from_simulated(simulated)
    }
}

impl CompletionPort for CompletionPortFacade {
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn post(&self, completion: Completion) -> crate::Result<()> {
        match self {
            Self::Real(real) => real.post(completion),
            #[cfg(test)]
            Self::Simulated(simulated) => simulated.post(completion),
        }
    }

    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn dequeue(
        &mut self,
        entries: &mut Vec<Completion>,
        max_entries: usize,
        timeout: Option<Duration>,
        mode: DrainMode,
    ) -> crate::Result<()> {
        match self {
            Self::Real(real) => real.dequeue(entries, max_entries, timeout, mode),
            #[cfg(test)]
            Self::Simulated(simulated) => simulated.dequeue(entries, max_entries, timeout, mode),
        }
    }

    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn poster(&self) -> CompletionPosterFacade {
        match self {
            Self::Real(real) => real.poster(),
            #[cfg(test)]
            Self::Simulated(simulated) => simulated.poster(),
        }
    }
}
