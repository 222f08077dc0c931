use crate::argmax::argmax;
use crate::convergence::ConvergenceState;
use crate::crossover_binomial::binomial_crossover;
use crate::evaluator::Evaluator;
use crate::objective::Objective;
use crate::parallel_eval::evaluate_batch;
use crate::{GenerationRecord, OmeaDE, OmeaReport, Termination};
use log::{debug, warn};
use ndarray::{Array1, Array2};
use rand::Rng;

// ------------------------------ Internal helpers ------------------------------

impl<'a, E> OmeaDE<'a, E>
where
    E: Evaluator + ?Sized,
{
    /// First individual: explicit `x0`, else the evaluator's live values.
    ///
    /// Returns `None` when the live state is missing for any dimension, in
    /// which case row 0 is sampled like every other row.
    pub(crate) fn seed_individual(&self, objective: &Objective<'_, E>) -> Option<Array1<f64>> {
        if let Some(x0) = &self.config.x0 {
            return Some(x0.clone());
        }
        let n = self.bounds.len();
        let live: Vec<Option<f64>> = (0..n).map(|d| objective.current(d)).collect();
        let known = live.iter().filter(|v| v.is_some()).count();
        if known == n {
            let x: Array1<f64> = live.into_iter().flatten().collect();
            debug!("row 0 seeded from live values {:?}", x.to_vec());
            return Some(x);
        }
        if known > 0 {
            warn!(
                "live values known for {}/{} dimensions; row 0 is sampled at random",
                known, n
            );
        } else {
            debug!("no live values exposed; row 0 is sampled at random");
        }
        None
    }

    /// Donor then trial for slot `i`, drawn from `pop` with best slot `best_idx`.
    fn trial_for<R: Rng + ?Sized>(
        &self,
        i: usize,
        pop: &Array2<f64>,
        best_idx: usize,
        rng: &mut R,
    ) -> Array1<f64> {
        let donor = self.config.strategy.donor(
            i,
            pop,
            best_idx,
            self.config.mutation,
            &self.bounds,
            rng,
        );
        let target = pop.row(i).to_owned();
        binomial_crossover(&target, &donor, self.config.recombination, rng)
    }

    /// One generation with in-place greedy replacement.
    ///
    /// Slot `i` sees the replacements already made for slots `0..i`. The
    /// trial is scored before its target; the trial replaces the target only
    /// on a strictly greater score. Returns the number of replacements.
    pub(crate) fn generation_sequential<R: Rng + ?Sized>(
        &self,
        pop: &mut Array2<f64>,
        fitness: &mut Array1<f64>,
        objective: &Objective<'_, E>,
        rng: &mut R,
    ) -> usize {
        let mut accepted = 0;
        for i in 0..pop.nrows() {
            let (best_idx, _) = argmax(fitness);
            let trial = self.trial_for(i, pop, best_idx, rng);
            let f_trial = objective.score(&trial);
            let f_target = objective.score(&pop.row(i).to_owned());
            if f_trial > f_target {
                pop.row_mut(i).assign(&trial);
                fitness[i] = f_trial;
                accepted += 1;
            } else {
                fitness[i] = f_target;
            }
        }
        accepted
    }

    /// One generation built from a frozen population and scored as a batch.
    ///
    /// All trials come from the population as it stood when the generation
    /// started; the trial/target pairs are then scored together and
    /// selection runs in slot order.
    pub(crate) fn generation_batched<R: Rng + ?Sized>(
        &self,
        pop: &mut Array2<f64>,
        fitness: &mut Array1<f64>,
        objective: &Objective<'_, E>,
        rng: &mut R,
    ) -> usize {
        let npop = pop.nrows();
        let (best_idx, _) = argmax(fitness);

        let mut candidates = Vec::with_capacity(2 * npop);
        for i in 0..npop {
            candidates.push(self.trial_for(i, pop, best_idx, rng));
            candidates.push(pop.row(i).to_owned());
        }
        let scores = evaluate_batch(&candidates, objective, &self.config.parallel);

        let mut accepted = 0;
        for i in 0..npop {
            let (f_trial, f_target) = (scores[2 * i], scores[2 * i + 1]);
            if f_trial > f_target {
                pop.row_mut(i).assign(&candidates[2 * i]);
                fitness[i] = f_trial;
                accepted += 1;
            } else {
                fitness[i] = f_target;
            }
        }
        accepted
    }

    pub(crate) fn finish_report(
        &self,
        pop: Array2<f64>,
        fitness: Array1<f64>,
        termination: Termination,
        state: &ConvergenceState,
        objective: &Objective<'_, E>,
        trace: Vec<GenerationRecord>,
    ) -> OmeaReport {
        let (best_idx, fun) = argmax(&fitness);
        let x = pop.row(best_idx).to_owned();
        let message = match termination {
            Termination::Converged => format!(
                "Converged: best fitness unchanged for {} generations",
                state.stagnant()
            ),
            Termination::MaxGenerations => {
                format!("Maximum generations ({}) reached", state.generation())
            }
            Termination::Callback => "Optimization stopped by callback".to_string(),
        };
        OmeaReport {
            x,
            fun,
            termination,
            message,
            generations: state.generation(),
            nfev: objective.nfev(),
            failed_evaluations: objective.failures(),
            population: pop,
            fitness,
            trace,
        }
    }
}
