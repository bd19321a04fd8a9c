pub mod threaded_export_dispatcher;
