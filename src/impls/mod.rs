mod ytdlp_backend;
