pub mod assignment;
pub mod movement;
pub mod patrol;
pub mod spawner;
