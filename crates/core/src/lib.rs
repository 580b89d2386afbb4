pub mod alert {
    pub mod domain {
        pub mod alarm;
        pub mod alert_debouncer;
    }
    pub mod infrastructure {
        pub mod bell_alarm;
        pub mod command_alarm;
    }
}

pub mod capture {
    pub mod alert_event;
    pub mod alert_log;
}

pub mod detection {
    pub mod domain {
        pub mod detection;
        pub mod object_detector;
        pub mod person_filter;
    }
    pub mod infrastructure;
}

pub mod display {
    pub mod domain {
        pub mod frame_display;
    }
    pub mod infrastructure {
        pub mod overlay_painter;
        pub mod snapshot_display;
    }
}

pub mod notify {
    pub mod domain {
        pub mod chat_webhook;
        pub mod notifier;
        pub mod notify_error;
        pub mod object_store;
        pub mod upload_notifier;
    }
    pub mod infrastructure {
        pub mod queued_notifier;
        pub mod s3_object_store;
        pub mod slack_webhook;
    }
}

pub mod pipeline {
    pub mod capture_alert_use_case;
    pub mod monitor_logger;
    pub mod monitor_use_case;
    pub mod infrastructure {
        pub mod quit_listener;
    }
}

pub mod shared {
    pub mod clock;
    pub mod constants;
    pub mod frame;
    pub mod geometry;
    pub mod model_resolver;
}

pub mod video {
    pub mod domain {
        pub mod frame_source;
        pub mod image_writer;
    }
    pub mod infrastructure {
        pub mod ffmpeg_frame_source;
        pub mod image_dir_source;
        pub mod jpeg_image_writer;
    }
}

pub mod zone {
    pub mod danger_zone;
}
