pub mod noui;
