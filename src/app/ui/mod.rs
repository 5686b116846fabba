mod clusters;
mod controls;
mod details;
mod panels;
