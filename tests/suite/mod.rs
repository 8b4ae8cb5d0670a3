mod binary;
mod config_flow;
mod lifecycle;
mod relay;
