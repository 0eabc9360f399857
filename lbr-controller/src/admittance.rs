use crate::controller_config::AdmittanceParameters;
use crate::types::CartesianVector;

/// Mass-spring-damper relating external wrench to Cartesian acceleration
#[derive(Debug, Clone, PartialEq)]
pub struct AdmittanceImpl {
    parameters: AdmittanceParameters,
}

impl AdmittanceImpl {
    pub fn new(parameters: AdmittanceParameters) -> Self {
        AdmittanceImpl { parameters }
    }

    pub fn parameters(&self) -> &AdmittanceParameters {
        &self.parameters
    }

    /// `x` is the displacement from the rest pose
    pub fn compute(
        &self,
        f_ext: &CartesianVector,
        x: &CartesianVector,
        dx: &CartesianVector,
    ) -> CartesianVector {
        (f_ext - dx * self.parameters.damping - x * self.parameters.stiffness)
            / self.parameters.mass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn admittance(mass: f64, damping: f64, stiffness: f64) -> AdmittanceImpl {
        AdmittanceImpl::new(AdmittanceParameters {
            mass,
            damping,
            stiffness,
        })
    }

    #[test]
    fn resting_without_force_does_not_accelerate() {
        let ddx = AdmittanceImpl::new(AdmittanceParameters::default()).compute(
            &CartesianVector::zeros(),
            &CartesianVector::zeros(),
            &CartesianVector::zeros(),
        );
        assert_relative_eq!(ddx, CartesianVector::zeros());
    }

    #[test]
    fn force_is_scaled_by_mass() {
        let f_ext = CartesianVector::new(2.0, 0.0, -4.0, 0.0, 1.0, 0.0);
        let ddx = admittance(2.0, 0.0, 0.0).compute(
            &f_ext,
            &CartesianVector::zeros(),
            &CartesianVector::zeros(),
        );
        assert_relative_eq!(ddx, CartesianVector::new(1.0, 0.0, -2.0, 0.0, 0.5, 0.0));
    }

    #[test]
    fn damping_and_stiffness_oppose_motion() {
        let x = CartesianVector::from_element(0.5);
        let dx = CartesianVector::from_element(2.0);
        let ddx = admittance(1.0, 0.1, 4.0).compute(&CartesianVector::zeros(), &x, &dx);
        assert_relative_eq!(ddx, CartesianVector::from_element(-0.2 - 2.0));
    }

    #[test]
    fn balanced_force_keeps_equilibrium() {
        let x = CartesianVector::new(0.01, 0.0, 0.0, 0.0, 0.0, 0.0);
        let f_ext = CartesianVector::new(5.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let ddx = admittance(1.0, 0.1, 500.0).compute(&f_ext, &x, &CartesianVector::zeros());
        assert_relative_eq!(ddx, CartesianVector::zeros(), epsilon = 1e-12);
    }
}
