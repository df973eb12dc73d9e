pub(crate) mod algo;
