mod abstract_types;
mod basic;
mod cancellation;
mod defer;
mod mutation;
mod null_propagation;
mod stream;
