mod compaction_test;
mod recovery_test;
