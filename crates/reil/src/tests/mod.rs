mod arm;
