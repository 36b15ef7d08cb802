pub mod story_sweeper;
