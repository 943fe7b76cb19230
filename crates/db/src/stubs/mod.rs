mod tree;

pub use tree::StubTreeStore;
