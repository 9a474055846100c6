// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::pal::{Completion, CompletionPoster, CompletionPosterImpl};
#[cfg(test)]
use crate::testing::SimulatedCompletionPoster;

#[derive(Clone, Debug)]
pub enum CompletionPosterFacade {
    Real(CompletionPosterImpl),

    #[cfg(test)]
    Simulated(SimulatedCompletionPoster),
}

impl CompletionPosterFacade {
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    pub(crate) const fn from_real(real: CompletionPosterImpl) -> Self {
        Self::Real(real)
    }

    #[cfg(test)]
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    pub(crate) const fn from_simulated(simulated: SimulatedCompletionPoster) -> Self {
        Self::Simulated(simulated)
    }
}

impl From<CompletionPosterImpl> for CompletionPosterFacade {
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn from(real: CompletionPosterImpl) -> Self {
        Self::from_real(real)
    }
}

#[cfg(test)]
impl From<SimulatedCompletionPoster> for CompletionPosterFacade {
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn from(simulated: SimulatedCompletionPoster) -> Self {
        Self::from_simulated(simulated)
    }
}

impl CompletionPoster for CompletionPosterFacade {
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn post(&self, completion: Completion) -> crate::Result<()> {
        match self {
            Self::Real(real) => real.post(completion),
            #[cfg(test)]
            Self::Simulated(simulated) => simulated.post(completion),
        }
    }
}
