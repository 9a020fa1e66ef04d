pub(crate) mod fakes;

mod degradation;
