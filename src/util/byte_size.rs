pub(crate) const KIB: usize = 1024;
